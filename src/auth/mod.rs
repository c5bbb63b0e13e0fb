//! Request authentication: resolving bearer values to live sessions.

mod errors;
mod extractors;
mod state;

pub use errors::AuthError;
pub use extractors::{Auth, CurrentSession, RequestMeta, bearer_token};
pub use state::HasAuthState;
