//! Golden Gate fragment design.
//!
//! Splits a long sequence into synthesizable fragments whose 4 bp junction
//! overhangs are chosen to maximize the set efficiency of a
//! [`FidelityTable`]. Consecutive fragments share their junction overhang:
//! the last four bases of one fragment are the first four of the next.
//!
//! [`block_fragment`] instead draws junctions from a fixed overhang set so
//! that very long sequences can be built as several assemblies.

use basepair_core::{BasepairError, Result};

use crate::fidelity::{FidelityTable, OVERHANG_LENGTH};
use crate::transform::{is_palindromic, reverse_complement};

/// Smallest fragment the optimizer will produce.
pub const MIN_FRAGMENT_SIZE: usize = 12;

/// A node of a hierarchical assembly plan.
///
/// Leaves carry the oligo-sized `fragments`; intermediate nodes carry the
/// `sub_assemblies` that are built first and then joined.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assembly {
    pub sequence: String,
    pub fragments: Vec<String>,
    pub efficiency: f64,
    pub sub_assemblies: Vec<Assembly>,
}

fn matches_overhang(candidate: &str, overhangs: &[String]) -> bool {
    overhangs
        .iter()
        .any(|o| o == candidate || reverse_complement(o) == candidate)
}

/// Fragment `sequence` into pieces of `min_size..=max_size` bases.
///
/// The first and last four bases of the sequence and every entry of
/// `exclude_overhangs` are never used as junctions. Returns the fragments
/// and the set efficiency of all overhangs involved.
///
/// # Errors
///
/// Fails when `min_size > max_size`, when `min_size` is below
/// [`MIN_FRAGMENT_SIZE`], or when no acceptable junction exists in a window
/// (for example a homopolymer run).
pub fn fragment(
    table: &FidelityTable,
    sequence: &str,
    min_size: usize,
    max_size: usize,
    exclude_overhangs: &[String],
) -> Result<(Vec<String>, f64)> {
    fragment_with_overhangs(table, sequence, min_size, max_size, exclude_overhangs, &[])
}

/// Like [`fragment`], but junctions are restricted to `include_overhangs`
/// (either strand) when that list is non-empty.
pub fn fragment_with_overhangs(
    table: &FidelityTable,
    sequence: &str,
    min_size: usize,
    max_size: usize,
    exclude_overhangs: &[String],
    include_overhangs: &[String],
) -> Result<(Vec<String>, f64)> {
    if !sequence.is_ascii() {
        return Err(BasepairError::InvalidInput("sequence must be ASCII".into()));
    }
    if sequence.len() < OVERHANG_LENGTH {
        return Err(BasepairError::InvalidInput(format!(
            "sequence of {} bp is too short to fragment",
            sequence.len()
        )));
    }
    let sequence = sequence.to_ascii_uppercase();
    let mut exclude = Vec::with_capacity(exclude_overhangs.len() + 2);
    exclude.push(sequence[..OVERHANG_LENGTH].to_string());
    exclude.push(sequence[sequence.len() - OVERHANG_LENGTH..].to_string());
    exclude.extend(exclude_overhangs.iter().map(|o| o.to_ascii_uppercase()));

    optimize(table, &sequence, min_size, max_size, exclude, include_overhangs)
}

fn optimize(
    table: &FidelityTable,
    sequence: &str,
    mut min_size: usize,
    max_size: usize,
    mut exclude: Vec<String>,
    include: &[String],
) -> Result<(Vec<String>, f64)> {
    let include: Vec<String> = include.iter().map(|o| o.to_ascii_uppercase()).collect();
    let mut fragments = Vec::new();
    let mut rest = sequence;

    loop {
        let mut window_max = max_size;
        if rest.len() < window_max {
            fragments.push(rest.to_string());
            return Ok((fragments, table.set_efficiency(&exclude)));
        }
        if min_size > window_max {
            return Err(BasepairError::InvalidInput(format!(
                "minFragmentSize ({min_size}) larger than maxFragmentSize ({window_max})"
            )));
        }
        if min_size < MIN_FRAGMENT_SIZE {
            return Err(BasepairError::InvalidInput(format!(
                "minFragmentSize must be equal to or greater than {MIN_FRAGMENT_SIZE}. Got size of {min_size}"
            )));
        }

        // Split a short tail evenly instead of leaving a runt fragment.
        if rest.len() < 2 * window_max {
            let spread = window_max - min_size;
            let half = rest.len() / 2;
            min_size = half.saturating_sub(spread).max(MIN_FRAGMENT_SIZE);
            window_max = half;
        }

        let mut best_efficiency = 0.0;
        let mut best_position = None;
        for position in (min_size..=window_max).rev() {
            let Some(candidate) = rest.get(position - OVERHANG_LENGTH..position) else {
                continue;
            };
            if matches_overhang(candidate, &exclude) {
                continue;
            }
            if !include.is_empty() && !matches_overhang(candidate, &include) {
                continue;
            }
            if is_palindromic(candidate) {
                continue;
            }
            exclude.push(candidate.to_string());
            let efficiency = table.set_efficiency(&exclude);
            exclude.pop();
            if efficiency > best_efficiency {
                best_efficiency = efficiency;
                best_position = Some(position);
            }
        }

        let position = best_position.ok_or_else(|| {
            BasepairError::Combinatorial(format!(
                "no usable overhang between positions {min_size} and {window_max}"
            ))
        })?;
        fragments.push(rest[..position].to_string());
        exclude.push(rest[position - OVERHANG_LENGTH..position].to_string());
        rest = &rest[position - OVERHANG_LENGTH..];
    }
}

fn push_unique(overhangs: &mut Vec<String>, overhang: &str) {
    if !overhangs.iter().any(|o| o == overhang) {
        overhangs.push(overhang.to_string());
    }
}

/// Fragment `sequence` into blocks joined only through `available_overhangs`.
///
/// Unlike [`fragment`], a junction only has to be compatible with the
/// overhangs of the first `max_blocks_per_assembly` blocks, so long
/// sequences can be split into several assemblies that reuse a small
/// overhang set. When the remaining sequence is short relative to one
/// assembly, its last four bases are reserved too. A junction must push the
/// set efficiency above `min_efficiency`; among those the longest block
/// with the best efficiency wins.
///
/// # Errors
///
/// Fails on the same size bounds as [`fragment`], when
/// `max_blocks_per_assembly` is zero, when an available overhang is
/// palindromic, or when a window holds no usable overhang.
pub fn block_fragment(
    table: &FidelityTable,
    sequence: &str,
    mut min_size: usize,
    max_size: usize,
    max_blocks_per_assembly: usize,
    min_efficiency: f64,
    available_overhangs: &[String],
) -> Result<Vec<String>> {
    if !sequence.is_ascii() {
        return Err(BasepairError::InvalidInput("sequence must be ASCII".into()));
    }
    if max_blocks_per_assembly == 0 {
        return Err(BasepairError::InvalidInput("an assembly needs at least one block".into()));
    }
    let sequence = sequence.to_ascii_uppercase();
    let available: Vec<String> = available_overhangs.iter().map(|o| o.to_ascii_uppercase()).collect();
    let mut blocks: Vec<String> = Vec::new();
    let mut rest = sequence.as_str();

    loop {
        if rest.len() < max_size {
            blocks.push(rest.to_string());
            return Ok(blocks);
        }
        if min_size > max_size {
            return Err(BasepairError::InvalidInput(format!(
                "minFragmentSize ({min_size}) larger than maxFragmentSize ({max_size})"
            )));
        }
        if min_size < MIN_FRAGMENT_SIZE {
            return Err(BasepairError::InvalidInput(format!(
                "minFragmentSize must be equal to or greater than {MIN_FRAGMENT_SIZE}. Got size of {min_size}"
            )));
        }

        let mut window_max = max_size;
        if rest.len() < 2 * max_size {
            let half = rest.len() / 2;
            min_size = half.saturating_sub(max_size - min_size).max(MIN_FRAGMENT_SIZE);
            window_max = half;
        }

        let mut taken: Vec<String> = Vec::new();
        for block in blocks.iter().take(max_blocks_per_assembly) {
            if let Some(tail) = block.get(block.len().saturating_sub(OVERHANG_LENGTH)..) {
                push_unique(&mut taken, tail);
            }
        }
        let head = if blocks.len() < max_blocks_per_assembly {
            rest
        } else {
            blocks
                .get(max_blocks_per_assembly)
                .or_else(|| blocks.last())
                .map_or(rest, String::as_str)
        };
        if let Some(overhang) = head.get(..OVERHANG_LENGTH) {
            push_unique(&mut taken, overhang);
        }
        if (rest.len() as f64 / max_size as f64 / max_blocks_per_assembly as f64) < 0.8 {
            push_unique(&mut taken, &rest[rest.len() - OVERHANG_LENGTH..]);
        }

        let mut candidates: Vec<(&str, f64)> = Vec::new();
        for overhang in &available {
            if is_palindromic(overhang) {
                return Err(BasepairError::InvalidInput(format!("{overhang} is palindromic")));
            }
            if matches_overhang(overhang, &taken) {
                continue;
            }
            taken.push(overhang.clone());
            candidates.push((overhang.as_str(), table.set_efficiency(&taken)));
            taken.pop();
        }

        let mut best_efficiency = 0.0;
        let mut best_position = None;
        for position in (min_size..=window_max).rev() {
            let Some(site) = rest.get(position - OVERHANG_LENGTH..position) else {
                continue;
            };
            for strand in [site.to_string(), reverse_complement(site)] {
                let Some(&(_, efficiency)) = candidates.iter().find(|(o, _)| *o == strand) else {
                    continue;
                };
                if efficiency > best_efficiency && efficiency > min_efficiency {
                    best_efficiency = efficiency;
                    best_position = Some(position);
                }
            }
        }

        let position = best_position.ok_or_else(|| {
            BasepairError::Combinatorial(format!(
                "no available overhang between positions {min_size} and {window_max}"
            ))
        })?;
        blocks.push(rest[..position].to_string());
        rest = &rest[position - OVERHANG_LENGTH..];
    }
}

/// Parameters for [`recursive_fragment`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecursiveFragmentOptions {
    /// Longest oligo that can be synthesized, flanks included.
    pub max_oligo_size: usize,
    /// Fragments joined per assembly at each level, leaves first.
    pub assembly_pattern: Vec<usize>,
    pub exclude_overhangs: Vec<String>,
    pub include_overhangs: Vec<String>,
    /// Prepended to every fragment, e.g. a type IIS site.
    pub forward_flank: String,
    /// Appended to every fragment.
    pub reverse_flank: String,
}

impl Default for RecursiveFragmentOptions {
    fn default() -> Self {
        Self {
            max_oligo_size: 174,
            assembly_pattern: vec![5, 4, 4, 5],
            exclude_overhangs: Vec::new(),
            include_overhangs: Vec::new(),
            forward_flank: String::new(),
            reverse_flank: String::new(),
        }
    }
}

// Slack left at each level for finding good overhangs.
const LEAF_WINDOW: usize = 60;
const NODE_WINDOW: usize = 100;

/// Plan a hierarchical assembly of `sequence`.
///
/// Level `0` holds what a single assembly of `assembly_pattern[0]` oligos
/// can cover; each higher level multiplies by its pattern entry. The
/// sequence is split at the smallest level that fits and each piece is
/// planned recursively.
///
/// # Errors
///
/// Fails with `Fragment too long!` when the sequence exceeds the top level,
/// and propagates any fragmentation failure.
pub fn recursive_fragment(
    table: &FidelityTable,
    sequence: &str,
    options: &RecursiveFragmentOptions,
) -> Result<Assembly> {
    let sequence: String = sequence.chars().filter(|&c| c != '\n' && c != '\r').collect();
    let flanks = options.forward_flank.len() + options.reverse_flank.len();
    let (&first, rest) = options
        .assembly_pattern
        .split_first()
        .ok_or_else(|| BasepairError::InvalidInput("assembly pattern is empty".into()))?;
    let leaf_size = options
        .max_oligo_size
        .checked_sub(flanks)
        .ok_or_else(|| BasepairError::InvalidInput("flanks are longer than the maximum oligo".into()))?;

    let mut sizes = vec![leaf_size * first];
    for &factor in rest {
        let previous = sizes[sizes.len() - 1];
        sizes.push((previous * factor).saturating_sub(LEAF_WINDOW));
    }

    let flanked = format!("{}{sequence}{}", options.forward_flank, options.reverse_flank);
    if sequence.len() <= sizes[0] {
        let (fragments, efficiency) = fragment_with_overhangs(
            table,
            &flanked,
            options.max_oligo_size.saturating_sub(LEAF_WINDOW),
            options.max_oligo_size,
            &options.exclude_overhangs,
            &options.include_overhangs,
        )?;
        return Ok(Assembly {
            sequence,
            fragments,
            efficiency,
            sub_assemblies: Vec::new(),
        });
    }

    for (level, size) in sizes.iter().enumerate().skip(1) {
        if sequence.len() > *size {
            continue;
        }
        let piece_size = sizes[level - 1];
        let (pieces, efficiency) = fragment_with_overhangs(
            table,
            &flanked,
            piece_size.saturating_sub(NODE_WINDOW),
            piece_size,
            &options.exclude_overhangs,
            &options.include_overhangs,
        )?;
        let sub_assemblies = pieces
            .iter()
            .map(|piece| recursive_fragment(table, piece, options))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Assembly {
            sequence,
            fragments: Vec::new(),
            efficiency,
            sub_assemblies,
        });
    }

    Err(BasepairError::Combinatorial("Fragment too long!".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fidelity::tests::synthetic_table;

    const LAC_Z: &str = "ATGACCATGATTACGCCAAGCTTGCATGCCTGCAGGTCGACTCTAGAGGATCCCCGGGTACCGAGCTCGAATTCACTGGCCGTCGTTTTACAACGTCGTGACTGGGAAAACCCTGGCGTTACCCAACTTAATCGCCTTGCAGCACATCCCCCTTTCGCCAGCTGGCGTAATAGCGAAGAGGCCCGCACCGATCGCCCTTCCCAACAGTTGCGCAGCCTGAATGGCGAATGGCGCCTGATGCGGTATTTTCTCCTTACGCATCTGTGCGGTATTTCACACCGCATATGGTGCACTCTCAGTACAATCTGCTCTGATGCCGCATAG";

    const DEFAULT_OVERHANGS: [&str; 46] = [
        "GGGG", "AAAA", "AACT", "AATG", "ATCC", "CGCT", "TTCT", "AAGC", "ATAG", "ATTA", "ATGT", "ACTC", "ACGA",
        "TATC", "TAGG", "TACA", "TTAC", "TTGA", "TGGA", "GAAG", "GACC", "GCCG", "TCTG", "GTTG", "GTGC", "TGCC",
        "CTGG", "TAAA", "TGAG", "AAGA", "AGGT", "TTCG", "ACTA", "TTAG", "TCTC", "TCGG", "ATAA", "ATCA", "TTGC",
        "CACG", "AATA", "ACAA", "ATGG", "TATG", "AAAT", "TCAC",
    ];

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    /// Rejoin fragments that overlap by one overhang.
    fn rejoin(fragments: &[String]) -> String {
        let mut joined = fragments[0].clone();
        for fragment in &fragments[1..] {
            joined.push_str(&fragment[OVERHANG_LENGTH..]);
        }
        joined
    }

    fn junctions(fragments: &[String]) -> Vec<String> {
        fragments[..fragments.len() - 1]
            .iter()
            .map(|f| f[f.len() - OVERHANG_LENGTH..].to_string())
            .collect()
    }

    #[test]
    fn fragments_reassemble_the_input() {
        let table = synthetic_table();
        let (fragments, efficiency) = fragment(&table, &LAC_Z.to_lowercase(), 90, 110, &[]).unwrap();
        assert_eq!(fragments.len(), 4);
        assert_eq!(rejoin(&fragments), LAC_Z);
        assert!(fragments.iter().all(|f| f.len() <= 110));
        assert_eq!(efficiency, 1.0);
    }

    #[test]
    fn small_windows_stay_in_bounds() {
        let table = synthetic_table();
        let (fragments, _) = fragment(&table, LAC_Z, 12, 30, &[]).unwrap();
        assert_eq!(fragments.len(), 14);
        assert!(fragments.iter().all(|f| f.len() <= 30));
        assert_eq!(rejoin(&fragments), LAC_Z);
    }

    #[test]
    fn junctions_are_unique_and_not_palindromic() {
        let table = synthetic_table();
        let (fragments, _) = fragment(&table, LAC_Z, 12, 30, &[]).unwrap();
        let junctions = junctions(&fragments);
        for (i, a) in junctions.iter().enumerate() {
            assert!(!is_palindromic(a));
            for b in &junctions[i + 1..] {
                assert_ne!(a, b);
                assert_ne!(&reverse_complement(a), b);
            }
        }
    }

    #[test]
    fn junctions_respect_include_list() {
        let table = synthetic_table();
        let include = strings(&DEFAULT_OVERHANGS);
        let (fragments, _) = fragment_with_overhangs(&table, LAC_Z, 90, 110, &[], &include).unwrap();
        assert_eq!(rejoin(&fragments), LAC_Z);
        for junction in junctions(&fragments) {
            assert!(matches_overhang(&junction, &include), "{junction} not allowed");
        }
    }

    #[test]
    fn short_sequences_are_returned_whole() {
        let table = synthetic_table();
        let (fragments, _) = fragment(&table, "ATGCATGCATGC", 12, 30, &[]).unwrap();
        assert_eq!(fragments, vec!["ATGCATGCATGC".to_string()]);
    }

    #[test]
    fn homopolymer_cannot_be_fragmented() {
        let table = synthetic_table();
        let poly_a = "A".repeat(200);
        assert!(fragment(&table, &poly_a, 40, 80, &[]).is_err());
    }

    #[test]
    fn size_bounds_are_checked() {
        let table = synthetic_table();
        let err = fragment(&table, LAC_Z, 105, 95, &[]).unwrap_err();
        assert!(err.to_string().contains("larger than maxFragmentSize"));
        assert!(fragment(&table, LAC_Z, 7, 95, &[]).is_err());
        assert!(fragment(&table, "ATG", 12, 30, &[]).is_err());
    }

    #[test]
    fn blocks_from_a_small_overhang_set() {
        let table = synthetic_table();
        let available = strings(&[
            "CGAG", "GTCT", "GGGG", "AAAA", "AACT", "AATG", "ATCC", "CGCT", "TTCT", "AAGC", "ATAG", "ATTA",
        ]);
        let blocks = block_fragment(&table, LAC_Z, 110, 180, 8, 0.5, &available).unwrap();
        assert_eq!(
            blocks,
            strings(&[
                "ATGACCATGATTACGCCAAGCTTGCATGCCTGCAGGTCGACTCTAGAGGATCCCCGGGTACCGAGCTCGAATTCACTGGCCGTCGTTTTACAACGTCGTGACTGGGAAAACCCTGGCGTTACCCAACTTAATCGCCTTGCAGCACATCCCCC",
                "CCCCTTTCGCCAGCTGGCGTAATAGCGAAGAGGCCCGCACCGATCGCCCTTCCCAACAGTTGCGCAGCCTGAATGGCGAATGGCGCCTGATGCGGTATTTTCTCCTTACGCATCTGTGCGGTATTTCACACCGCATATGGTGCACTCTCAGTACAATCTGCTCTGATGCCGCATAG",
            ])
        );
    }

    #[test]
    fn blocks_use_only_available_junctions() {
        let table = synthetic_table();
        let available = strings(&DEFAULT_OVERHANGS[..26]);
        let blocks = block_fragment(&table, LAC_Z, 40, 80, 2, 0.5, &available).unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(rejoin(&blocks), LAC_Z);
        assert!(blocks.iter().all(|b| b.len() <= 80));
        for junction in junctions(&blocks) {
            assert!(matches_overhang(&junction, &available), "{junction} not available");
        }
    }

    #[test]
    fn block_fragment_rejects_bad_input() {
        let table = synthetic_table();
        let available = strings(&["AACT", "GATC"]);
        let err = block_fragment(&table, LAC_Z, 110, 180, 8, 0.5, &available).unwrap_err();
        assert_eq!(err.to_string(), "invalid input: GATC is palindromic");
        assert!(block_fragment(&table, LAC_Z, 110, 180, 0, 0.5, &available[..1]).is_err());
        let poly_a = "A".repeat(200);
        let err = block_fragment(&table, &poly_a, 40, 80, 4, 0.5, &strings(&["GGGG"])).unwrap_err();
        assert!(matches!(err, BasepairError::Combinatorial(_)));
        assert_eq!(block_fragment(&table, "ATGC", 12, 30, 4, 0.5, &[]).unwrap(), strings(&["ATGC"]));
    }

    #[test]
    fn single_level_assembly() {
        let table = synthetic_table();
        let options = RecursiveFragmentOptions {
            exclude_overhangs: strings(&["CGAG", "GTCT"]),
            include_overhangs: strings(&DEFAULT_OVERHANGS),
            forward_flank: "GTCTCT".into(),
            reverse_flank: "CGAG".into(),
            ..RecursiveFragmentOptions::default()
        };
        let assembly = recursive_fragment(&table, LAC_Z, &options).unwrap();
        assert_eq!(assembly.sequence, LAC_Z);
        assert!(assembly.sub_assemblies.is_empty());
        assert_eq!(assembly.fragments.len(), 3);
        assert!(assembly.fragments[0].starts_with("GTCTCTATGACC"));
        assert!(assembly.fragments[2].ends_with("CGCATAGCGAG"));
        assert!(assembly.fragments.iter().all(|f| f.len() <= 174));
    }

    #[test]
    fn two_level_assembly() {
        let table = synthetic_table();
        let options = RecursiveFragmentOptions {
            exclude_overhangs: strings(&["CGAG", "GTCT"]),
            include_overhangs: strings(&DEFAULT_OVERHANGS),
            forward_flank: "GTCTCT".into(),
            reverse_flank: "CGAG".into(),
            ..RecursiveFragmentOptions::default()
        };
        let gene = LAC_Z.repeat(4);
        let assembly = recursive_fragment(&table, &gene, &options).unwrap();
        assert!(assembly.fragments.is_empty());
        assert_eq!(assembly.sub_assemblies.len(), 2);
        for sub in &assembly.sub_assemblies {
            assert_eq!(sub.fragments.len(), 5);
            assert!(sub.sub_assemblies.is_empty());
        }
    }

    #[test]
    fn oversized_sequences_are_rejected() {
        let table = synthetic_table();
        let options = RecursiveFragmentOptions {
            assembly_pattern: vec![2],
            ..RecursiveFragmentOptions::default()
        };
        let err = recursive_fragment(&table, &LAC_Z.repeat(2), &options).unwrap_err();
        assert_eq!(err.to_string(), "Fragment too long!");
    }
}
