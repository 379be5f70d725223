// Domain-driven modules
pub mod redeem;
