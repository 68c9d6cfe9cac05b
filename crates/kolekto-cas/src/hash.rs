//! Incremental content hashing.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::{ContentId, CHUNK_SIZE};

/// Digest used to name store entries.
///
/// A catalog is written with a single algorithm; mixing them in one store
/// only means the same bytes imported twice under different settings are
/// not recognised as duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// 40 hex characters. The historical format of kolekto trees.
    #[default]
    Sha1,
    /// 64 hex characters.
    Blake3,
}

impl HashAlgorithm {
    /// Length of the hex identifier this algorithm produces.
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 40,
            HashAlgorithm::Blake3 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha1 => write!(f, "sha1"),
            HashAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(HashAlgorithm::Sha1),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(format!("unknown hash algorithm: {}", other)),
        }
    }
}

/// Running digest over a byte stream.
pub enum ContentHasher {
    Sha1(Sha1),
    Blake3(Box<blake3::Hasher>),
}

impl ContentHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha1 => ContentHasher::Sha1(Sha1::new()),
            HashAlgorithm::Blake3 => ContentHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        match self {
            ContentHasher::Sha1(h) => h.update(data),
            ContentHasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Consume the hasher and return the lowercase hex identifier.
    pub fn finalize(self) -> ContentId {
        let hex = match self {
            ContentHasher::Sha1(h) => hex::encode(h.finalize()),
            ContentHasher::Blake3(h) => hex::encode(h.finalize().as_bytes()),
        };
        ContentId::from_entry_name(hex)
    }
}

/// Hash everything `reader` yields, reporting the cumulative byte count
/// after each chunk.
pub fn hash_reader<R, F>(algorithm: HashAlgorithm, mut reader: R, mut on_progress: F) -> io::Result<ContentId>
where
    R: Read,
    F: FnMut(u64),
{
    let mut hasher = ContentHasher::new(algorithm);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        total += n as u64;
        on_progress(total);
    }
    Ok(hasher.finalize())
}

/// Hash an in-memory buffer.
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> ContentId {
    let mut hasher = ContentHasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha1_known_vectors() {
        assert_eq!(
            hash_bytes(HashAlgorithm::Sha1, b"").as_str(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            hash_bytes(HashAlgorithm::Sha1, b"abc").as_str(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_blake3_known_vector() {
        assert_eq!(
            hash_bytes(HashAlgorithm::Blake3, b"").as_str(),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn test_hash_reader_matches_hash_bytes() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let mut reported = Vec::new();
        let id = hash_reader(HashAlgorithm::Sha1, &data[..], |n| reported.push(n)).unwrap();

        assert_eq!(id, hash_bytes(HashAlgorithm::Sha1, &data));
        assert_eq!(reported.last().copied(), Some(data.len() as u64));
        assert!(reported.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("SHA1".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha1);
        assert_eq!("blake3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert!("md5".parse::<HashAlgorithm>().is_err());
        assert_eq!(HashAlgorithm::Blake3.hex_len(), 64);
    }
}
