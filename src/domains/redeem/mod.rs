// ============================================================================
// REDEEM DOMAIN - Tokens de redención de un solo uso
// ============================================================================

pub mod admin;
pub mod generator;
pub mod memory;
pub mod models;
pub mod qr;
pub mod service;
pub mod store;

pub use admin::{AdminService, UserTokenSummary};
pub use generator::TokenGenerator;
pub use memory::MemoryTokenStore;
pub use models::{
    MonthSpecial, NewRedeemToken, RedeemError, RedeemToken, RedeemType, TokenFilter,
    UserTokenCounts,
};
pub use qr::{QrConfig, QrRenderer};
pub use service::{
    HistoryEntry, IssueTokenRequest, RedeemService, RedemptionOutcome, TokenView,
};
pub use store::{PgTokenStore, StoreError, TokenStore};
