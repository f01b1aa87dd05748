//! Single-pass hashing with several algorithms at once.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::Digest as _;
use xxhash_rust::xxh3::Xxh3;

use fimscan_core::{Digest, HashType, Hashes, ScanError};

/// Read buffer size for streaming file content into the hashers.
const BUFFER_SIZE: usize = 64 * 1024;

enum Engine {
    Blake3(Box<blake3::Hasher>),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Xxh3(Box<Xxh3>),
}

impl Engine {
    fn new(hash_type: HashType) -> Self {
        match hash_type {
            HashType::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashType::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashType::Sha512 => Self::Sha512(sha2::Sha512::new()),
            HashType::Xxh3 => Self::Xxh3(Box::new(Xxh3::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Xxh3(h) => h.update(data),
        }
    }

    fn finalize(self) -> Digest {
        match self {
            Self::Blake3(h) => Digest::new(h.finalize().as_bytes().to_vec()),
            Self::Sha256(h) => Digest::new(h.finalize().to_vec()),
            Self::Sha512(h) => Digest::new(h.finalize().to_vec()),
            Self::Xxh3(h) => Digest::new(h.digest().to_be_bytes().to_vec()),
        }
    }
}

/// Feeds the same bytes to one hasher per configured algorithm.
pub struct MultiHasher {
    engines: Vec<(HashType, Engine)>,
}

impl MultiHasher {
    /// Create hashers for the given algorithms. Duplicates are ignored.
    pub fn new(hash_types: &[HashType]) -> Self {
        let unique: BTreeSet<HashType> = hash_types.iter().copied().collect();
        Self {
            engines: unique.into_iter().map(|t| (t, Engine::new(t))).collect(),
        }
    }

    /// Check if no algorithm is configured.
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn update(&mut self, data: &[u8]) {
        for (_, engine) in &mut self.engines {
            engine.update(data);
        }
    }

    /// Consume the hashers and collect their digests.
    pub fn finalize(self) -> Hashes {
        self.engines
            .into_iter()
            .map(|(t, engine)| (t, engine.finalize()))
            .collect()
    }
}

/// Hash at most `max_size` bytes of the file at `path`.
pub fn hash_file(path: &Path, max_size: u64, hash_types: &[HashType]) -> Result<Hashes, ScanError> {
    let file = File::open(path).map_err(|e| ScanError::io(path, e))?;
    let mut reader = file.take(max_size);
    let mut hasher = MultiHasher::new(hash_types);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ScanError::io(path, e)),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}
