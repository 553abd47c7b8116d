//! Checksum algorithms and streaming digests.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::ChecksumError;

/// Size of the buffer used to feed content into a digest.
pub const DIGEST_BUFFER_SIZE: usize = 64 * 1024;

/// Available algorithms to compute checksums.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
#[serde(try_from = "String", into = "&'static str")]
pub enum ChecksumAlgorithm {
    /// CRC-32 (IEEE), stored as 4 big-endian bytes.
    Crc32,
    /// MD5 message digest.
    Md5,
    /// SHA-256.
    #[default]
    Sha256,
    /// BLAKE3 (256-bit output).
    Blake3,
}

impl ChecksumAlgorithm {
    /// Parse an algorithm name, reporting unknown names as configuration errors.
    pub fn parse(name: &str) -> Result<Self, ChecksumError> {
        Self::from_str(name.trim()).map_err(|_| ChecksumError::UnknownAlgorithm {
            name: name.to_string(),
        })
    }

    /// Length in bytes of the digest produced by this algorithm.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Crc32 => 4,
            Self::Md5 => 16,
            Self::Sha256 | Self::Blake3 => 32,
        }
    }

    /// Create a fresh streaming digest for this algorithm.
    pub fn digester(&self) -> Digester {
        match self {
            Self::Crc32 => Digester::Crc32(crc32fast::Hasher::new()),
            Self::Md5 => Digester::Md5(md5::Md5::new()),
            Self::Sha256 => Digester::Sha256(sha2::Sha256::new()),
            Self::Blake3 => Digester::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl TryFrom<String> for ChecksumAlgorithm {
    type Error = ChecksumError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::parse(&name)
    }
}

/// Incremental digest over one of the supported algorithms.
pub enum Digester {
    Crc32(crc32fast::Hasher),
    Md5(md5::Md5),
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Digester {
    /// Feed bytes into the digest.
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Crc32(h) => h.update(bytes),
            Self::Md5(h) => h.update(bytes),
            Self::Sha256(h) => h.update(bytes),
            Self::Blake3(h) => {
                h.update(bytes);
            }
        }
    }

    /// Consume the digest and return its bytes.
    pub fn finalize(self) -> Checksum {
        match self {
            Self::Crc32(h) => Checksum::new(h.finalize().to_be_bytes().to_vec()),
            Self::Md5(h) => Checksum::new(h.finalize().to_vec()),
            Self::Sha256(h) => Checksum::new(h.finalize().to_vec()),
            Self::Blake3(h) => Checksum::new(h.finalize().as_bytes().to_vec()),
        }
    }

    /// Drain a reader into the digest, returning the number of bytes read.
    pub fn consume<R: Read + ?Sized>(&mut self, reader: &mut R) -> std::io::Result<u64> {
        let mut buffer = vec![0u8; DIGEST_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.update(&buffer[..bytes_read]);
            total += bytes_read as u64;
        }
        Ok(total)
    }
}

impl fmt::Debug for Digester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Crc32(_) => "Crc32",
            Self::Md5(_) => "Md5",
            Self::Sha256(_) => "Sha256",
            Self::Blake3(_) => "Blake3",
        };
        f.debug_tuple("Digester").field(&name).finish()
    }
}

/// Digest bytes of a file's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(pub Vec<u8>);

impl Checksum {
    /// Create a checksum from raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the checksum as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn digest(algorithm: ChecksumAlgorithm, data: &[u8]) -> String {
        let mut digester = algorithm.digester();
        digester.update(data);
        digester.finalize().to_hex()
    }

    #[test]
    fn test_known_answers() {
        assert_eq!(digest(ChecksumAlgorithm::Crc32, b"123456789"), "cbf43926");
        assert_eq!(
            digest(ChecksumAlgorithm::Md5, b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            digest(ChecksumAlgorithm::Sha256, b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            digest(ChecksumAlgorithm::Blake3, b""),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        for algorithm in ChecksumAlgorithm::iter() {
            let mut digester = algorithm.digester();
            digester.update(b"hello ");
            digester.update(b"world");
            assert_eq!(digester.finalize().to_hex(), digest(algorithm, b"hello world"));
        }
    }

    #[test]
    fn test_digest_len() {
        for algorithm in ChecksumAlgorithm::iter() {
            assert_eq!(
                algorithm.digester().finalize().as_bytes().len(),
                algorithm.digest_len()
            );
        }
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(ChecksumAlgorithm::parse("sha256").unwrap(), ChecksumAlgorithm::Sha256);
        assert_eq!(ChecksumAlgorithm::parse("CRC32").unwrap(), ChecksumAlgorithm::Crc32);
        assert_eq!(ChecksumAlgorithm::parse(" md5 ").unwrap(), ChecksumAlgorithm::Md5);
        assert!(matches!(
            ChecksumAlgorithm::parse("whirlpool"),
            Err(ChecksumError::UnknownAlgorithm { .. })
        ));
        assert_eq!(ChecksumAlgorithm::Sha256.to_string(), "SHA256");
    }

    #[test]
    fn test_consume_reader() {
        let data = vec![7u8; DIGEST_BUFFER_SIZE * 2 + 13];
        let mut digester = ChecksumAlgorithm::Sha256.digester();
        let read = digester.consume(&mut data.as_slice()).unwrap();
        assert_eq!(read, data.len() as u64);
        assert_eq!(digester.finalize().to_hex(), digest(ChecksumAlgorithm::Sha256, &data));
    }
}
