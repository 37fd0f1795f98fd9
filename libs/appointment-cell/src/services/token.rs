// libs/appointment-cell/src/services/token.rs
use rand::{distributions::Alphanumeric, Rng};

/// Source of the opaque tokens customers use to confirm or decline.
pub trait ConfirmationTokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Fixed-length `[A-Za-z0-9]` tokens drawn from the thread-local CSPRNG.
#[derive(Debug, Clone)]
pub struct AlphanumericTokenGenerator {
    length: usize,
}

impl AlphanumericTokenGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl ConfirmationTokenGenerator for AlphanumericTokenGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}
