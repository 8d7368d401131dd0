pub mod refresh;
pub mod store;

pub use refresh::{refresh_session, SessionRefresher, TokenRefresher};
pub use store::TokenStore;
