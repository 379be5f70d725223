use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generador de identificadores de token.
///
/// Draws from the thread-local CSPRNG, so token strings are unguessable as
/// well as collision-resistant. Uniqueness is still enforced by the store;
/// the engine retries on the (vanishingly rare) collision.
pub struct TokenGenerator {
    length: usize,
}

impl TokenGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// Random alphanumeric token string of the configured length.
    pub fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self { length: 32 }
    }
}
