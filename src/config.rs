use chrono::{DateTime, Duration, Utc};
use std::env;

/// How long issued tokens stay redeemable and who may open the view page.
///
/// The two variants are alternatives, not knobs to mix: `ShortLived` is the
/// strict mode (24 hour horizon, only the owner may view, expiry checked on
/// view), `LongLived` is the permissive mode (multi-year horizon, anyone
/// holding the token string may view, only usage is checked).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    ShortLived,
    LongLived,
}

impl ExpiryPolicy {
    pub fn from_env() -> Self {
        match env::var("REDEEM_EXPIRY_POLICY").as_deref() {
            Ok("short") => ExpiryPolicy::ShortLived,
            _ => ExpiryPolicy::LongLived,
        }
    }

    pub fn horizon(&self) -> Duration {
        match self {
            ExpiryPolicy::ShortLived => Duration::hours(24),
            ExpiryPolicy::LongLived => Duration::days(3650),
        }
    }

    /// Expiry timestamp for a token issued at `now`.
    pub fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.horizon()
    }

    /// Whether the view page is restricted to the issuing user.
    pub fn owner_gated(&self) -> bool {
        matches!(self, ExpiryPolicy::ShortLived)
    }

    /// Whether the view page rejects expired tokens. Redemption itself never
    /// checks expiry in either mode.
    pub fn checks_expiry_on_view(&self) -> bool {
        matches!(self, ExpiryPolicy::ShortLived)
    }
}

/// Floor for generated token strings; the token string is the bearer
/// credential, so it never shrinks below this.
pub const MIN_TOKEN_LENGTH: usize = 32;

/// Runtime configuration for the redemption service, loaded from env vars.
#[derive(Debug, Clone)]
pub struct RedeemConfig {
    /// Length of generated token strings, at least `MIN_TOKEN_LENGTH`.
    pub token_length: usize,
    pub expiry_policy: ExpiryPolicy,
    /// Base URL embedded into QR validation links.
    pub public_base_url: String,
    /// Run against the in-memory store instead of Postgres (local dev).
    pub use_memory_store: bool,
}

impl RedeemConfig {
    pub fn from_env() -> Self {
        let token_length = env::var("REDEEM_TOKEN_LENGTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(MIN_TOKEN_LENGTH)
            .max(MIN_TOKEN_LENGTH);

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());

        let use_memory_store = env::var("REDEEM_STORE")
            .map(|v| v.eq_ignore_ascii_case("memory"))
            .unwrap_or(false);

        Self {
            token_length,
            expiry_policy: ExpiryPolicy::from_env(),
            public_base_url,
            use_memory_store,
        }
    }
}

impl Default for RedeemConfig {
    fn default() -> Self {
        Self {
            token_length: MIN_TOKEN_LENGTH,
            expiry_policy: ExpiryPolicy::LongLived,
            public_base_url: "http://localhost:8000".to_string(),
            use_memory_store: false,
        }
    }
}
