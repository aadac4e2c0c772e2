//! Digest primitives used by the hashing stages
//!
//! Stages only see the [`Digest`] trait. Any `Fn(&str) -> String` closure is a
//! digest, which is how tests inject stubs; [`DigestKind`] provides the
//! built-in digests used by the CLI. The defaults, crc32 over md5, give the
//! classic signer fingerprints.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DigestError;

/// A pure text-to-text digest function.
pub trait Digest: Send + Sync {
    fn digest(&self, data: &str) -> Result<String, DigestError>;
}

impl<F> Digest for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn digest(&self, data: &str) -> Result<String, DigestError> {
        Ok(self(data))
    }
}

/// Digest shared between a stage and its sub-tasks.
pub type SharedDigest = Arc<dyn Digest>;

/// Built-in digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestKind {
    /// IEEE CRC-32 rendered as a decimal checksum.
    Crc32,
    /// MD5 rendered as 32 hex characters.
    Md5,
    /// 32-bit xxHash rendered as a decimal checksum.
    Xxh32,
    /// 64-bit xxHash rendered as 16 hex characters.
    Xxh64,
    /// blake3 rendered as 64 hex characters.
    Blake3,
}

impl DigestKind {
    pub const ALL: [Self; 5] = [
        Self::Crc32,
        Self::Md5,
        Self::Xxh32,
        Self::Xxh64,
        Self::Blake3,
    ];

    /// Parse from name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "crc32" => Some(Self::Crc32),
            "md5" => Some(Self::Md5),
            "xxh32" => Some(Self::Xxh32),
            "xxh64" => Some(Self::Xxh64),
            "blake3" => Some(Self::Blake3),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Crc32 => "crc32",
            Self::Md5 => "md5",
            Self::Xxh32 => "xxh32",
            Self::Xxh64 => "xxh64",
            Self::Blake3 => "blake3",
        }
    }

    pub fn shared(self) -> SharedDigest {
        Arc::new(self)
    }
}

impl Digest for DigestKind {
    fn digest(&self, data: &str) -> Result<String, DigestError> {
        let bytes = data.as_bytes();
        Ok(match self {
            Self::Crc32 => crc32fast::hash(bytes).to_string(),
            Self::Md5 => format!("{:x}", <md5::Md5 as md5::Digest>::digest(bytes)),
            Self::Xxh32 => xxhash_rust::xxh32::xxh32(bytes, 0).to_string(),
            Self::Xxh64 => format!("{:016x}", xxhash_rust::xxh64::xxh64(bytes, 0)),
            Self::Blake3 => blake3::hash(bytes).to_hex().to_string(),
        })
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            let known: Vec<_> = Self::ALL.iter().map(|k| k.name()).collect();
            format!("unknown digest '{s}' (expected one of: {})", known.join(", "))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_is_digest() {
        let upper = |s: &str| s.to_uppercase();
        assert_eq!(upper.digest("abc").unwrap(), "ABC");
    }

    #[test]
    fn builtins_deterministic() {
        for kind in DigestKind::ALL {
            assert_eq!(kind.digest("hello").unwrap(), kind.digest("hello").unwrap());
            assert_ne!(kind.digest("hello").unwrap(), kind.digest("world").unwrap());
        }
    }

    #[test]
    fn xxh32_is_decimal() {
        let out = DigestKind::Xxh32.digest("hello").unwrap();
        assert!(out.chars().all(|c| c.is_ascii_digit()));
        assert!(out.parse::<u32>().is_ok());
    }

    #[test]
    fn fixed_width_hex() {
        assert_eq!(DigestKind::Xxh64.digest("").unwrap().len(), 16);
        assert_eq!(DigestKind::Blake3.digest("").unwrap().len(), 64);
    }

    #[test]
    fn blake3_matches_reference() {
        let expected = blake3::hash(b"fingerprint").to_hex().to_string();
        assert_eq!(DigestKind::Blake3.digest("fingerprint").unwrap(), expected);
    }

    #[test]
    fn crc32_matches_reference() {
        assert_eq!(DigestKind::Crc32.digest("").unwrap(), "0");
        assert_eq!(DigestKind::Crc32.digest("a").unwrap(), "3904355907");
        assert_eq!(DigestKind::Crc32.digest("hello").unwrap(), "907060870");
    }

    #[test]
    fn md5_matches_reference() {
        assert_eq!(
            DigestKind::Md5.digest("").unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            DigestKind::Md5.digest("0").unwrap(),
            "cfcd208495d565ef66e7dff9f98764da"
        );
    }

    #[test]
    fn crc32_over_md5_matches_signer_vector() {
        let md5 = DigestKind::Md5.digest("0").unwrap();
        assert_eq!(DigestKind::Crc32.digest(&md5).unwrap(), "502633748");
    }

    #[test]
    fn parse_names() {
        assert_eq!("xxh32".parse::<DigestKind>(), Ok(DigestKind::Xxh32));
        assert_eq!("BLAKE3".parse::<DigestKind>(), Ok(DigestKind::Blake3));
        assert_eq!("Md5".parse::<DigestKind>(), Ok(DigestKind::Md5));
        assert_eq!("crc32".parse::<DigestKind>(), Ok(DigestKind::Crc32));
        let err = "sha1".parse::<DigestKind>().unwrap_err();
        assert!(err.contains("crc32"));
        assert!(err.contains("xxh64"));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&DigestKind::Md5).unwrap();
        assert_eq!(json, "\"md5\"");
        let kind: DigestKind = serde_json::from_str("\"crc32\"").unwrap();
        assert_eq!(kind, DigestKind::Crc32);
    }

    #[test]
    fn display_roundtrips_name() {
        for kind in DigestKind::ALL {
            assert_eq!(DigestKind::from_name(&kind.to_string()), Some(kind));
        }
    }
}
