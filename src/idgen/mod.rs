use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of every generated short id.
pub const ID_LENGTH: usize = 8;

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// How a short id is derived from the original URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// SHA-256 of the URL, truncated. The same URL always maps to the
    /// same first candidate, so a duplicate URL hits the store's
    /// conflict check before ever producing a second id. Retry attempts
    /// salt the hash so a reserved short id does not pin the URL to one
    /// candidate forever.
    #[default]
    Hash,
    /// Uniform alphanumeric sampling. Relies on the store's short-id
    /// uniqueness check plus the service-level retry bound.
    Random,
}

/// Produces fixed-length alphanumeric short ids. Pure computation; all
/// uniqueness enforcement lives in the storage layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator {
    strategy: Strategy,
}

impl IdGenerator {
    pub fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    /// Candidate id for `original_url`. `attempt` is the zero-based
    /// retry counter: attempt 0 is the canonical (deterministic, for
    /// the hash strategy) candidate, later attempts must yield
    /// different ids or the retry loop above this call would spin on
    /// one reserved short id.
    pub fn generate(&self, original_url: &str, attempt: usize) -> String {
        match self.strategy {
            Strategy::Hash => hash_id(original_url, attempt),
            Strategy::Random => random_id(),
        }
    }
}

fn hash_id(original_url: &str, attempt: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(original_url.as_bytes());
    if attempt > 0 {
        hasher.update(attempt.to_le_bytes());
    }
    hasher
        .finalize()
        .iter()
        .take(ID_LENGTH)
        .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
        .collect()
}

fn random_id() -> String {
    let mut rng = rand::rng();
    (0..ID_LENGTH)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}
