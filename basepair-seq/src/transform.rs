//! Strand and rotation primitives over text sequences.
//!
//! Complements are IUPAC-aware and case-preserving: `a` maps to `t`, `R` to
//! `Y`, and self-complementary codes (`S`, `W`, `N`) map to themselves.
//! Bytes with no complement pass through unchanged.

/// Complement a single IUPAC nucleotide byte, preserving case.
#[inline]
pub fn complement_base(b: u8) -> u8 {
    match b {
        b'A' => b'T',
        b'T' => b'A',
        b'U' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'a' => b't',
        b't' => b'a',
        b'u' => b'a',
        b'g' => b'c',
        b'c' => b'g',
        b'r' => b'y',
        b'y' => b'r',
        b'k' => b'm',
        b'm' => b'k',
        b'b' => b'v',
        b'v' => b'b',
        b'd' => b'h',
        b'h' => b'd',
        other => other,
    }
}

#[inline]
fn complement_char(c: char) -> char {
    if c.is_ascii() {
        complement_base(c as u8) as char
    } else {
        c
    }
}

/// Complement every base of `seq`.
pub fn complement(seq: &str) -> String {
    seq.chars().map(complement_char).collect()
}

/// Reverse `seq`.
pub fn reverse(seq: &str) -> String {
    seq.chars().rev().collect()
}

/// Reverse complement of `seq`.
///
/// # Example
///
/// ```
/// use basepair_seq::transform::reverse_complement;
///
/// assert_eq!(reverse_complement("GGTCTC"), "GAGACC");
/// assert_eq!(reverse_complement("acgN"), "Ncgt");
/// ```
pub fn reverse_complement(seq: &str) -> String {
    seq.chars().rev().map(complement_char).collect()
}

/// Whether `seq` equals its own reverse complement.
///
/// Odd-length sequences are never palindromic in this sense.
pub fn is_palindromic(seq: &str) -> bool {
    if seq.len() % 2 == 1 {
        return false;
    }
    let bytes = seq.as_bytes();
    bytes
        .iter()
        .zip(bytes.iter().rev())
        .all(|(&a, &b)| a == complement_base(b))
}

/// Lexicographically smaller of `seq` and its reverse complement.
pub fn standardize_dna(seq: &str) -> String {
    let rc = reverse_complement(seq);
    if rc.as_str() < seq {
        rc
    } else {
        seq.to_string()
    }
}

/// Start index of the lexicographically least rotation (Booth, 1980).
///
/// Runs in O(n) over the doubled sequence. Returns 0 for empty input.
pub fn booth_least_rotation(seq: &str) -> usize {
    let s: Vec<u8> = seq.bytes().chain(seq.bytes()).collect();
    let mut least: isize = 0;
    let mut failure: Vec<isize> = vec![-1; s.len()];

    for j in 1..s.len() {
        let c = s[j];
        let j = j as isize;
        let mut i = failure[(j - least - 1) as usize];
        while i != -1 && c != s[(least + i + 1) as usize] {
            if c < s[(least + i + 1) as usize] {
                least = j - i - 1;
            }
            i = failure[i as usize];
        }
        if c != s[(least + i + 1) as usize] {
            // i == -1 here
            if c < s[least as usize] {
                least = j;
            }
            failure[(j - least) as usize] = -1;
        } else {
            failure[(j - least) as usize] = i + 1;
        }
    }
    least as usize
}

/// Rotate `seq` so it starts at index `start`.
pub fn rotate(seq: &str, start: usize) -> String {
    if seq.is_empty() {
        return String::new();
    }
    let start = start % seq.len();
    let bytes = seq.as_bytes();
    String::from_utf8_lossy(&[&bytes[start..], &bytes[..start]].concat()).into_owned()
}

/// Rotate `seq` to its least rotation.
pub fn rotate_to_least(seq: &str) -> String {
    rotate(seq, booth_least_rotation(seq))
}
