pub mod auth;

pub use auth::{extract_current_user, extract_user_from_headers, CurrentUser};
