//! Arbitrary-length radix codecs (base58, base94).
//!
//! Input bytes are treated as one big-endian unsigned integer and rewritten in
//! the target base by repeated division. Leading zero bytes are carried over
//! one-for-one as the first alphabet character so that encoding is lossless.

use crate::{BasepairError, Result};

/// Marks a byte with no position in an alphabet.
const INVALID: u8 = u8::MAX;

/// A positional alphabet with its inverse lookup table.
#[derive(Debug)]
pub struct Radix {
    alphabet: &'static [u8],
    lookup: [u8; 256],
}

/// The Bitcoin base58 alphabet (no `0`, `O`, `I`, `l`).
pub static BASE58: Radix =
    Radix::new(b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz");

/// Printable ASCII from `!` to `~`, the FASTQ quality range.
pub static BASE94: Radix = Radix::new(
    b"!\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~",
);

impl Radix {
    /// Build a codec over `alphabet`. Each byte's index is its digit value.
    pub const fn new(alphabet: &'static [u8]) -> Self {
        let mut lookup = [INVALID; 256];
        let mut i = 0;
        while i < alphabet.len() {
            lookup[alphabet[i] as usize] = i as u8;
            i += 1;
        }
        Self { alphabet, lookup }
    }

    /// Number of digits in this base.
    pub const fn base(&self) -> usize {
        self.alphabet.len()
    }

    /// Encode `input` into this base.
    pub fn encode(&self, input: &[u8]) -> String {
        let base = self.base() as u32;
        let zeros = input.iter().take_while(|&&b| b == 0).count();

        // Little-endian digits in the target base.
        let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 138 / 100 + 1);
        for &byte in &input[zeros..] {
            let mut carry = u32::from(byte);
            for digit in &mut digits {
                carry += u32::from(*digit) << 8;
                *digit = (carry % base) as u8;
                carry /= base;
            }
            while carry > 0 {
                digits.push((carry % base) as u8);
                carry /= base;
            }
        }

        let mut out = String::with_capacity(zeros + digits.len());
        out.extend(std::iter::repeat(self.alphabet[0] as char).take(zeros));
        out.extend(digits.iter().rev().map(|&d| self.alphabet[d as usize] as char));
        out
    }

    /// Decode a string produced by [`Radix::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`BasepairError::InvalidInput`] if `input` contains a character
    /// outside the alphabet.
    pub fn decode(&self, input: &str) -> Result<Vec<u8>> {
        let base = self.base() as u32;
        let input = input.as_bytes();
        let zero_char = self.alphabet[0];
        let zeros = input.iter().take_while(|&&c| c == zero_char).count();

        // Little-endian base-256 bytes.
        let mut bytes: Vec<u8> = Vec::with_capacity(input.len());
        for &c in &input[zeros..] {
            let value = self.lookup[c as usize];
            if value == INVALID {
                return Err(BasepairError::InvalidInput(format!(
                    "invalid character found: {:?}",
                    c as char
                )));
            }
            let mut carry = u32::from(value);
            for byte in &mut bytes {
                carry += u32::from(*byte) * base;
                *byte = (carry & 0xff) as u8;
                carry >>= 8;
            }
            while carry > 0 {
                bytes.push((carry & 0xff) as u8);
                carry >>= 8;
            }
        }

        let mut out = vec![0u8; zeros];
        out.extend(bytes.iter().rev());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn base58_known_vectors() {
        assert_eq!(BASE58.encode(b"hello world"), "StV1DL6CwTryKyV");
        assert_eq!(BASE58.encode(&[0, 0, 1]), "112");
        assert_eq!(BASE58.decode("StV1DL6CwTryKyV").unwrap(), b"hello world");
    }

    #[test]
    fn base58_empty() {
        assert_eq!(BASE58.encode(&[]), "");
        assert!(BASE58.decode("").unwrap().is_empty());
    }

    #[test]
    fn base58_rejects_excluded_letters() {
        for bad in ["0", "O", "I", "l", "/"] {
            let err = BASE58.decode(bad).unwrap_err();
            assert!(err.to_string().contains("invalid character found"));
        }
    }

    #[test]
    fn base94_leading_zeros() {
        let encoded = BASE94.encode(&[0x00, 0x00, 0x01]);
        assert!(encoded.starts_with("!!"));
        assert_eq!(BASE94.decode(&encoded).unwrap(), vec![0, 0, 1]);
        assert_eq!(BASE94.decode("!!abcdefgh").unwrap()[0], 0);
    }

    #[test]
    fn base94_invalid_character() {
        assert!(BASE94.decode("InvalidCharacterNotInAlphabet\n").is_err());
    }

    #[test]
    fn base94_quality_string_reencodes() {
        let quality = "$$&%&%#$)*59;/767C378411,***,('11<;:,0039/0&()&'2(/*((4.1.09751).601+'#&&&,-**/0-+3558,/)+&)'&&%&$$'%'%'&*/5978<9;**'3*'&&A?99:;:97:278?=9B?CLJHGG=9<@AC@@=>?=>D>=3<>=>3362$%/((+/%&+//.-,%-4:+..000,&$#%$$%+*)&*0%.//*?<<;>DE>.8942&&//074&$033)*&&&%**)%)962133-%'&*99><<=1144??6.027639.011/-)($#$(/422*4;:=122>?@6964:.5'8:52)*675=:4@;323&&##'.-57*4597)+0&:7<7-550REGB21/0+*79/&/6538())+)+23665+(''$$$'-2(&&*-.-#$&%%$$,-)&$$#$'&,);;<C<@454)#";
        let bytes = BASE94.decode(quality).unwrap();
        assert_eq!(BASE94.encode(&bytes), quality);
    }

    proptest! {
        #[test]
        fn base58_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assert_eq!(BASE58.decode(&BASE58.encode(&data)).unwrap(), data);
        }

        #[test]
        fn base94_string_roundtrip(s in "[!-~]{0,80}") {
            let bytes = BASE94.decode(&s).unwrap();
            prop_assert_eq!(BASE94.encode(&bytes), s);
        }
    }
}
