use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bit width of every fingerprint.
pub const FINGERPRINT_BITS: u32 = 64;

const HEX_LEN: usize = (FINGERPRINT_BITS / 4) as usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseFingerprintError {
    #[error("expected 16 hex digits, got {len}")]
    Length { len: usize },

    #[error("invalid hex digit in {value:?}")]
    InvalidDigit { value: String },
}

/// 64-bit perceptual fingerprint. Canonical form is 16 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Builds a fingerprint from a hash of exactly eight bytes, most significant first.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 8] = bytes.try_into().ok()?;
        Some(Self(u64::from_be_bytes(arr)))
    }

    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    /// Hamming distance.
    pub fn distance(self, other: Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Distance to a stored key; a key that does not parse counts as maximally distant.
    pub fn distance_to_key(self, key: &str) -> u32 {
        match key.parse::<Fingerprint>() {
            Ok(other) => self.distance(other),
            Err(e) => {
                log::warn!("Ignoring malformed fingerprint key {:?}: {}", key, e);
                FINGERPRINT_BITS
            }
        }
    }
}

/// `1 - distance / 64`, clamped to `[0, 1]`.
pub fn similarity_score(distance: u32) -> f64 {
    let d = distance.min(FINGERPRINT_BITS);
    1.0 - f64::from(d) / f64::from(FINGERPRINT_BITS)
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HEX_LEN {
            return Err(ParseFingerprintError::Length { len: s.len() });
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseFingerprintError::InvalidDigit {
                value: s.to_string(),
            });
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| ParseFingerprintError::InvalidDigit {
                value: s.to_string(),
            })
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ParseFingerprintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_is_fixed_width() {
        assert_eq!(Fingerprint::from_bits(0).to_hex(), "0000000000000000");
        assert_eq!(Fingerprint::from_bits(0xff).to_hex(), "00000000000000ff");
        assert_eq!(Fingerprint::from_bits(u64::MAX).to_hex(), "ffffffffffffffff");
        assert_eq!(Fingerprint::from_bits(0xabc).to_string().len(), 16);
    }

    #[test]
    fn test_parse() {
        let fp: Fingerprint = "c3d1e0f0a0b09080".parse().unwrap();
        assert_eq!(fp.bits(), 0xc3d1_e0f0_a0b0_9080);
        assert_eq!("C3D1E0F0A0B09080".parse::<Fingerprint>().unwrap(), fp);

        assert_eq!(
            "abc".parse::<Fingerprint>(),
            Err(ParseFingerprintError::Length { len: 3 })
        );
        assert!(matches!(
            "zzzzzzzzzzzzzzzz".parse::<Fingerprint>(),
            Err(ParseFingerprintError::InvalidDigit { .. })
        ));
        assert!("+000000000000000".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn test_from_bytes() {
        let fp = Fingerprint::from_bytes(&[0x01, 0, 0, 0, 0, 0, 0, 0x02]).unwrap();
        assert_eq!(fp.to_hex(), "0100000000000002");
        assert!(Fingerprint::from_bytes(&[1, 2, 3]).is_none());
        assert!(Fingerprint::from_bytes(&[0; 9]).is_none());
    }

    #[test]
    fn test_distance_symmetric_and_zero_on_self() {
        let samples = [0u64, 1, 0xdead_beef, 0x0123_4567_89ab_cdef, u64::MAX];
        for &a in &samples {
            let fa = Fingerprint::from_bits(a);
            assert_eq!(fa.distance(fa), 0);
            for &b in &samples {
                let fb = Fingerprint::from_bits(b);
                assert_eq!(fa.distance(fb), fb.distance(fa));
            }
        }
        assert_eq!(
            Fingerprint::from_bits(0).distance(Fingerprint::from_bits(u64::MAX)),
            64
        );
        assert_eq!(
            Fingerprint::from_bits(0b1010).distance(Fingerprint::from_bits(0b0110)),
            2
        );
    }

    #[test]
    fn test_malformed_key_is_maximally_distant() {
        let fp = Fingerprint::from_bits(0);
        assert_eq!(fp.distance_to_key("not-a-hash"), FINGERPRINT_BITS);
        assert_eq!(fp.distance_to_key(""), FINGERPRINT_BITS);
        assert_eq!(fp.distance_to_key("000000000000000f"), 4);
    }

    #[test]
    fn test_similarity_score_bounds() {
        assert_eq!(similarity_score(0), 1.0);
        assert_eq!(similarity_score(64), 0.0);
        assert_eq!(similarity_score(16), 0.75);
        assert_eq!(similarity_score(999), 0.0);
        for d in 0..=64 {
            let s = similarity_score(d);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let fp = Fingerprint::from_bits(0x10);
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, "\"0000000000000010\"");
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
        assert!(serde_json::from_str::<Fingerprint>("\"xyz\"").is_err());
    }
}
