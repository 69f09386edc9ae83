//! Content digests.

use sha2::{Digest, Sha256};

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5, as published by older index entries
    Md5,
    /// SHA-256
    Sha256,
}

/// A hex digest together with its algorithm.
///
/// # Examples
///
/// ```
/// use cheeseshop_storage::{Checksum, ChecksumAlgorithm};
///
/// let digest = Checksum::compute(ChecksumAlgorithm::Md5, b"");
/// assert_eq!(digest.hex(), "d41d8cd98f00b204e9800998ecf8427e");
/// assert!(digest.matches(&Checksum::md5("D41D8CD98F00B204E9800998ECF8427E")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{}:{}", algorithm, hex)]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    hex: String,
}

impl Checksum {
    /// Wrap an expected hex digest.
    pub fn new(algorithm: ChecksumAlgorithm, hex: impl Into<String>) -> Self {
        Self {
            algorithm,
            hex: hex.into(),
        }
    }

    /// Expected MD5 digest.
    pub fn md5(hex: impl Into<String>) -> Self {
        Self::new(ChecksumAlgorithm::Md5, hex)
    }

    /// Expected SHA-256 digest.
    pub fn sha256(hex: impl Into<String>) -> Self {
        Self::new(ChecksumAlgorithm::Sha256, hex)
    }

    /// Digest a buffer in one go.
    pub fn compute(algorithm: ChecksumAlgorithm, data: &[u8]) -> Self {
        let mut hasher = ChecksumHasher::new(algorithm);
        hasher.update(data);
        hasher.finish()
    }

    /// The algorithm.
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// The hex digest as given.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Same algorithm and same digest, ignoring hex case.
    pub fn matches(&self, other: &Checksum) -> bool {
        self.algorithm == other.algorithm && self.hex.eq_ignore_ascii_case(&other.hex)
    }
}

enum HasherState {
    Md5(md5::Context),
    Sha256(Sha256),
}

/// Incremental digest over streamed chunks.
pub struct ChecksumHasher {
    state: HasherState,
}

impl ChecksumHasher {
    /// Start a digest.
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        let state = match algorithm {
            ChecksumAlgorithm::Md5 => HasherState::Md5(md5::Context::new()),
            ChecksumAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
        };
        Self { state }
    }

    /// Feed a chunk.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Md5(context) => context.consume(data),
            HasherState::Sha256(hasher) => hasher.update(data),
        }
    }

    /// Finish and render as lowercase hex.
    pub fn finish(self) -> Checksum {
        match self.state {
            HasherState::Md5(context) => {
                Checksum::md5(format!("{:x}", context.compute()))
            }
            HasherState::Sha256(hasher) => Checksum::sha256(hex::encode(hasher.finalize())),
        }
    }
}

impl std::fmt::Debug for ChecksumHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let algorithm = match self.state {
            HasherState::Md5(_) => ChecksumAlgorithm::Md5,
            HasherState::Sha256(_) => ChecksumAlgorithm::Sha256,
        };
        f.debug_struct("ChecksumHasher")
            .field("algorithm", &algorithm)
            .finish()
    }
}
