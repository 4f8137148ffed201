//! Type IIS restriction cutting, ligation and Golden Gate assembly.
//!
//! A cut releases [`Fragment`]s whose sticky ends are kept as separate
//! overhang strings. Ligation chains fragments whose overhangs agree, on
//! either strand, into a single linear or circular product.

use std::sync::OnceLock;

use regex::Regex;

use basepair_core::{BasepairError, Result};

use crate::transform::{is_palindromic, reverse_complement};

/// A restriction enzyme that cuts outside its recognition site.
#[derive(Debug, Clone)]
pub struct Enzyme {
    /// Enzyme name (e.g. "BsaI").
    pub name: String,
    /// Recognition site on the top strand, uppercase.
    pub recognition_site: String,
    /// Matches the recognition site on the top strand.
    pub forward_site: Regex,
    /// Matches the reverse complement of the recognition site.
    pub reverse_site: Regex,
    /// Bases between the end of the site and the cut.
    pub skip: usize,
    /// Length of the single-stranded overhang left by the cut.
    pub overhang_length: usize,
}

impl Enzyme {
    /// Build an enzyme from a literal A/C/G/T recognition site.
    ///
    /// # Errors
    ///
    /// Returns [`BasepairError::InvalidInput`] if the site is empty.
    pub fn new(name: &str, recognition_site: &str, skip: usize, overhang_length: usize) -> Result<Self> {
        if recognition_site.is_empty() {
            return Err(BasepairError::InvalidInput(format!(
                "enzyme {name} has an empty recognition site"
            )));
        }
        let site = recognition_site.to_ascii_uppercase();
        let compile = |pattern: &str| {
            Regex::new(&regex::escape(pattern))
                .map_err(|e| BasepairError::InvalidInput(format!("enzyme {name}: {e}")))
        };
        Ok(Self {
            name: name.to_string(),
            forward_site: compile(&site)?,
            reverse_site: compile(&reverse_complement(&site))?,
            recognition_site: site,
            skip,
            overhang_length,
        })
    }
}

/// The built-in enzyme table: BsaI, BbsI, BtgZI, PaqCI and BsmBI.
pub fn default_enzymes() -> &'static [Enzyme] {
    static ENZYMES: OnceLock<Vec<Enzyme>> = OnceLock::new();
    ENZYMES.get_or_init(|| {
        [
            ("BsaI", "GGTCTC", 1),
            ("BbsI", "GAAGAC", 2),
            ("BtgZI", "GCGATG", 10),
            ("PaqCI", "CACCTGC", 4),
            ("BsmBI", "CGTCTC", 1),
        ]
        .into_iter()
        .filter_map(|(name, site, skip)| Enzyme::new(name, site, skip, 4).ok())
        .collect()
    })
}

/// Look up a built-in enzyme by name.
pub fn enzyme_by_name(name: &str) -> Result<&'static Enzyme> {
    default_enzymes()
        .iter()
        .find(|e| e.name == name)
        .ok_or_else(|| BasepairError::InvalidInput(format!("enzyme not found: {name}")))
}

/// A DNA molecule to be cut.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Part {
    pub sequence: String,
    pub circular: bool,
}

impl Part {
    pub fn linear(sequence: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
            circular: false,
        }
    }

    pub fn circular(sequence: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
            circular: true,
        }
    }
}

/// A double-stranded fragment with its sticky ends split out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fragment {
    pub sequence: String,
    pub forward_overhang: String,
    pub reverse_overhang: String,
}

impl Fragment {
    pub fn new(
        sequence: impl Into<String>,
        forward_overhang: impl Into<String>,
        reverse_overhang: impl Into<String>,
    ) -> Self {
        Self {
            sequence: sequence.into(),
            forward_overhang: forward_overhang.into(),
            reverse_overhang: reverse_overhang.into(),
        }
    }
}

/// A cut position found in the working sequence.
///
/// Forward cuts start their overhang at `position`; reverse cuts end it there.
#[derive(Debug, Clone, Copy)]
struct Cut {
    position: isize,
    forward: bool,
}

impl Cut {
    fn overhang_start(self, overhang_length: isize) -> isize {
        if self.forward {
            self.position
        } else {
            self.position - overhang_length
        }
    }
}

/// Byte-range slice of an ASCII sequence, `None` when out of bounds.
fn slice(seq: &str, start: isize, end: isize) -> Option<&str> {
    let start = usize::try_from(start).ok()?;
    let end = usize::try_from(end).ok()?;
    seq.get(start..end)
}

/// Cut `part` with `enzyme`, returning fragments in positional order.
///
/// With `directional` set and a non-palindromic site, only segments flanked
/// by a forward cut on the left and a reverse cut on the right are released,
/// which is what survives a Golden Gate reaction. Unless `methylated` is set
/// the sequence is uppercased first, so lowercase (methylated) sites do not
/// cut. Segments of 8 bp or less are discarded. Pathological inputs yield
/// an empty vector rather than an error.
///
/// # Example
///
/// ```
/// use basepair_seq::restriction::{cut_with_enzyme, enzyme_by_name, Part};
///
/// let bsai = enzyme_by_name("BsaI").unwrap();
/// let part = Part::linear("ATATATATATATATATGGTCTCAGCGCGCGCGCGCGCGCGCGCGCGC");
/// let fragments = cut_with_enzyme(&part, false, bsai, false);
/// assert_eq!(fragments.len(), 2);
/// assert_eq!(fragments[0].sequence, "GCGCGCGCGCGCGCGCGCGC");
/// assert_eq!(fragments[1].sequence, "ATATATATATATATATGGTCTCA");
/// ```
pub fn cut_with_enzyme(part: &Part, directional: bool, enzyme: &Enzyme, methylated: bool) -> Vec<Fragment> {
    let original_len = part.sequence.len() as isize;
    let mut sequence = if part.circular {
        part.sequence.repeat(2)
    } else {
        part.sequence.clone()
    };
    if !methylated {
        sequence = sequence.to_ascii_uppercase();
    }
    let len = sequence.len() as isize;
    let skip = enzyme.skip as isize;
    let overhang_length = enzyme.overhang_length as isize;
    let site_plus_skip = enzyme.recognition_site.len() as isize + skip;
    let palindromic = is_palindromic(&enzyme.recognition_site);

    let mut forward: Vec<Cut> = enzyme
        .forward_site
        .find_iter(&sequence)
        .map(|m| Cut {
            position: m.end() as isize + skip,
            forward: true,
        })
        .collect();
    let mut reverse: Vec<Cut> = if palindromic {
        Vec::new()
    } else {
        enzyme
            .reverse_site
            .find_iter(&sequence)
            .map(|m| Cut {
                position: m.start() as isize - skip,
                forward: false,
            })
            .collect()
    };

    if !part.circular {
        for cuts in [&mut forward, &mut reverse] {
            cuts.retain(|c| c.position + skip + overhang_length <= len);
        }
    }

    let mut cuts: Vec<Cut> = forward.into_iter().chain(reverse).collect();
    cuts.retain(|c| {
        let start = c.overhang_start(overhang_length);
        start >= 0 && start + overhang_length <= len
    });
    cuts.sort_by_key(|c| c.position);

    if cuts.len() == 1 && !directional && !part.circular {
        return single_linear_cut(&sequence, cuts[0], overhang_length).unwrap_or_default();
    }

    if part.circular && !directional && !cuts.is_empty() && original_len > overhang_length {
        let mut starts: Vec<isize> = cuts
            .iter()
            .map(|c| c.overhang_start(overhang_length).rem_euclid(original_len))
            .collect();
        starts.sort_unstable();
        starts.dedup();
        if starts.len() == 1 {
            return single_circular_cut(&sequence, starts[0], overhang_length, original_len)
                .into_iter()
                .collect();
        }
    }

    let mut segments: Vec<&str> = Vec::new();
    for pair in cuts.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        if !(directional && !palindromic) || (current.forward && !next.forward) {
            if let Some(segment) = slice(&sequence, current.position, next.position) {
                segments.push(segment);
            }
        }
        if next.position - site_plus_skip > original_len {
            break;
        }
    }

    let oh = enzyme.overhang_length;
    segments
        .into_iter()
        .filter(|s| s.len() > 8)
        .map(|s| Fragment {
            sequence: s[oh..s.len() - oh].to_string(),
            forward_overhang: s[..oh].to_string(),
            reverse_overhang: s[s.len() - oh..].to_string(),
        })
        .collect()
}

fn single_linear_cut(sequence: &str, cut: Cut, overhang_length: isize) -> Option<Vec<Fragment>> {
    let len = sequence.len() as isize;
    let start = cut.overhang_start(overhang_length);
    let end = start + overhang_length;
    let overhang = slice(sequence, start, end)?;
    let left = slice(sequence, 0, start)?;
    let right = slice(sequence, end, len)?;
    let fragments = if cut.forward {
        vec![
            Fragment::new(right, overhang, ""),
            Fragment::new(left, "", overhang),
        ]
    } else {
        vec![
            Fragment::new(left, "", overhang),
            Fragment::new(right, overhang, ""),
        ]
    };
    Some(fragments)
}

/// One cut in a circle: the body runs from after the overhang all the way
/// around to its start, which may cross the origin.
fn single_circular_cut(doubled: &str, start: isize, overhang_length: isize, original_len: isize) -> Option<Fragment> {
    let overhang = slice(doubled, start, start + overhang_length)?;
    let body = slice(doubled, start + overhang_length, start + original_len)?;
    Some(Fragment::new(body, overhang, overhang))
}

/// Cut with a built-in enzyme looked up by name.
pub fn cut_with_enzyme_by_name(part: &Part, directional: bool, name: &str, methylated: bool) -> Result<Vec<Fragment>> {
    let enzyme = enzyme_by_name(name)?;
    Ok(cut_with_enzyme(part, directional, enzyme, methylated))
}

/// Ligate fragments into one product, returning it with the ligation order.
///
/// Starting from `fragments[0]`, the first unused fragment (in input order)
/// whose forward overhang matches the current reverse overhang is appended;
/// failing that, a fragment whose reverse overhang matches in reverse
/// complement is flipped and appended. Fragments that never chain are
/// dropped.
///
/// # Errors
///
/// [`BasepairError::Combinatorial`] when `fragments` is empty or a circular
/// product's ends do not match.
pub fn ligate(fragments: &[Fragment], circular: bool) -> Result<(String, Vec<usize>)> {
    let seed = fragments
        .first()
        .ok_or_else(|| BasepairError::Combinatorial("no fragments to ligate".into()))?;

    let mut used = vec![false; fragments.len()];
    used[0] = true;
    let mut pattern = vec![0];
    let mut body = seed.sequence.clone();
    let mut reverse_overhang = seed.reverse_overhang.clone();

    loop {
        let mut joined = false;
        for (i, fragment) in fragments.iter().enumerate() {
            if used[i] {
                continue;
            }
            if reverse_overhang == fragment.forward_overhang {
                body.push_str(&reverse_overhang);
                body.push_str(&fragment.sequence);
                reverse_overhang.clone_from(&fragment.reverse_overhang);
            } else if reverse_overhang == reverse_complement(&fragment.reverse_overhang) {
                body.push_str(&reverse_overhang);
                body.push_str(&reverse_complement(&fragment.sequence));
                reverse_overhang = reverse_complement(&fragment.forward_overhang);
            } else {
                continue;
            }
            used[i] = true;
            pattern.push(i);
            joined = true;
            break;
        }
        if !joined {
            break;
        }
    }

    if circular {
        if seed.forward_overhang != reverse_overhang {
            return Err(BasepairError::Combinatorial("does not circularize".into()));
        }
        return Ok((format!("{}{body}", seed.forward_overhang), pattern));
    }
    Ok((format!("{}{body}{reverse_overhang}", seed.forward_overhang), pattern))
}

/// Simulate a one-pot Golden Gate reaction.
///
/// Every part is cut directionally and the released fragments are ligated
/// into a circular product.
pub fn golden_gate(parts: &[Part], enzyme: &Enzyme, methylated: bool) -> Result<(String, Vec<usize>)> {
    let fragments: Vec<Fragment> = parts
        .iter()
        .flat_map(|part| cut_with_enzyme(part, true, enzyme, methylated))
        .collect();
    ligate(&fragments, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bsai() -> &'static Enzyme {
        enzyme_by_name("BsaI").unwrap()
    }

    /// Parts from a FASTA fixture; a `circular` description marks a plasmid.
    fn fasta_parts(text: &str) -> Vec<Part> {
        text.split('>')
            .filter(|r| !r.is_empty())
            .map(|record| {
                let (header, body) = record.split_once('\n').unwrap();
                let sequence: String = body.lines().collect();
                if header.ends_with(" circular") {
                    Part::circular(sequence)
                } else {
                    Part::linear(sequence)
                }
            })
            .collect()
    }

    const SINGLE_SITE: &str = "ATATATATATATATATGGTCTCAGCGCGCGCGCGCGCGCGCGCGCGC";

    #[test]
    fn single_linear_cut_yields_two_stubs() {
        let fragments = cut_with_enzyme(&Part::linear(SINGLE_SITE), false, bsai(), false);
        assert_eq!(
            fragments,
            vec![
                Fragment::new("GCGCGCGCGCGCGCGCGCGC", "GCGC", ""),
                Fragment::new("ATATATATATATATATGGTCTCA", "", "GCGC"),
            ]
        );
    }

    #[test]
    fn single_circular_cut_yields_rotated_fragment() {
        let fragments = cut_with_enzyme(&Part::circular(SINGLE_SITE), false, bsai(), false);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].sequence, "GCGCGCGCGCGCGCGCGCGCATATATATATATATATGGTCTCA");
        assert_eq!(fragments[0].forward_overhang, "GCGC");
        assert_eq!(fragments[0].reverse_overhang, "GCGC");
    }

    #[test]
    fn circular_cut_across_the_origin() {
        // Site near the end so the overhang wraps to the start of the circle.
        let seq = "GCGCATATATATATATATATATATGGTCTCAGC";
        let fragments = cut_with_enzyme(&Part::circular(seq), false, bsai(), false);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].forward_overhang, "GCGC");
        assert_eq!(fragments[0].sequence, "GCATATATATATATATATATATGGTCTCA");
    }

    #[test]
    fn reverse_site_regression() {
        let part = Part::linear("AGCTGCTGTTTAAAGCTATTACTTTGAGACC");
        let fragments = cut_with_enzyme(&part, false, bsai(), false);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].reverse_overhang, "ACTT");
        assert_eq!(fragments[1].forward_overhang, "ACTT");
    }

    #[test]
    fn directional_multi_site() {
        let seq = [
            "ATATATA",
            "ATGCAGAGACC",
            "GGTCTCAATGC",
            "ATGCATCGATCGACTAGCATG",
            "ATGCAGAGACC",
            "GGTCTCAA",
        ]
        .concat();

        let linear = cut_with_enzyme(&Part::linear(seq.clone()), true, bsai(), false);
        assert_eq!(linear.len(), 1);
        assert_eq!(linear[0].sequence, "ATGCATCGATCGACTAGCATG");

        let circular = cut_with_enzyme(&Part::circular(seq), true, bsai(), false);
        assert_eq!(circular.len(), 2);
        assert_eq!(circular[0].sequence, "ATGCATCGATCGACTAGCATG");
        assert_eq!(circular[1].sequence, "TATA");
    }

    #[test]
    fn methylated_sites_do_not_cut() {
        let part = Part::linear("ATATATATATATATATggtctcAGCGCGCGCGCGCGCGCGCGCGCGC");
        assert!(cut_with_enzyme(&part, false, bsai(), true).is_empty());
        assert_eq!(cut_with_enzyme(&part, false, bsai(), false).len(), 2);
    }

    #[test]
    fn pathological_inputs_do_not_panic() {
        for seq in ["", "GGTCTC", "GAGACC", "GGTCTCA", "AGAGACC"] {
            for circular in [false, true] {
                let part = Part { sequence: seq.into(), circular };
                let _ = cut_with_enzyme(&part, false, bsai(), false);
                let _ = cut_with_enzyme(&part, true, bsai(), false);
            }
        }
    }

    #[test]
    fn unknown_enzyme() {
        let err = cut_with_enzyme_by_name(&Part::linear("ATGC"), false, "EcoRI", false).unwrap_err();
        assert!(err.to_string().contains("enzyme not found"));
    }

    #[test]
    fn default_table_is_complete() {
        let names: Vec<&str> = default_enzymes().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["BsaI", "BbsI", "BtgZI", "PaqCI", "BsmBI"]);
        assert_eq!(enzyme_by_name("PaqCI").unwrap().reverse_site.as_str(), "GCAGGTG");
    }

    #[test]
    fn ligate_circular() {
        let fragments = vec![
            Fragment::new("AAAAAA", "GTTG", "CTAT"),
            Fragment::new("AAAAAA", "CAAC", "ATAG"),
        ];
        let (product, pattern) = ligate(&fragments, true).unwrap();
        assert_eq!(product, "GTTGAAAAAACTATTTTTTT");
        assert_eq!(pattern, vec![0, 1]);
    }

    #[test]
    fn ligate_linear() {
        let fragments = vec![
            Fragment::new("AAAAAA", "GTTG", "CTAT"),
            Fragment::new("AAAAAA", "ATGC", "ATAG"),
        ];
        let (product, _) = ligate(&fragments, false).unwrap();
        assert_eq!(product, "GTTGAAAAAACTATTTTTTTGCAT");
        assert!(ligate(&fragments, true)
            .unwrap_err()
            .to_string()
            .contains("does not circularize"));
    }

    #[test]
    fn ligate_prefers_first_match_in_input_order() {
        let fragments = vec![
            Fragment::new("AAAA", "GGGG", "TTTT"),
            Fragment::new("CCCC", "TTTT", "GGGG"),
            Fragment::new("GGGA", "TTTT", "GGGG"),
        ];
        let (product, pattern) = ligate(&fragments, true).unwrap();
        assert_eq!(pattern, vec![0, 1]);
        assert_eq!(product, "GGGGAAAATTTTCCCC");
    }

    #[test]
    fn ligate_empty() {
        assert!(ligate(&[], false).is_err());
    }

    #[test]
    fn golden_gate_round_trip() {
        let insert = Part::linear("GGTCTCAATGCAAAAAAAAAAAAAAAGCTTGAGACC");
        let vector = Part::circular("GGTCTCAAGCTCCCCCCCCCCATGCTGAGACCTTTTTTTT");
        let (product, pattern) = golden_gate(&[insert, vector], bsai(), false).unwrap();
        assert_eq!(pattern, vec![0, 1]);
        assert_eq!(product, "ATGCAAAAAAAAAAAAAAAGCTCCCCCCCCCC");
    }

    #[test]
    fn directional_cut_of_plasmid_with_site_across_the_origin() {
        // The BsaI cut lands on the far side of the origin from its site.
        let parts = fasta_parts(include_str!("../tests/data/circular_cut_regression.fasta"));
        assert!(parts[0].circular);
        let fragments = cut_with_enzyme_by_name(&parts[0], true, "BsaI", false).unwrap();
        assert_eq!(fragments.len(), 1);
    }

    #[test]
    fn methylated_vector_still_assembles() {
        let parts = fasta_parts(include_str!("../tests/data/methylated_golden_gate.fasta"));
        assert_eq!(parts.len(), 4);
        let (product, pattern) = golden_gate(&parts, bsai(), true).unwrap();
        assert_eq!(product.len(), 2134);
        assert_eq!(pattern, vec![0, 1, 2, 3]);
    }
}
