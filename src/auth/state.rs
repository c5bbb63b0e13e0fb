//! Authentication state trait and macro.

use crate::db::Database;
use crate::token::TokenConfig;

/// Trait for state types that provide database and token access for
/// authentication.
pub trait HasAuthState {
    fn tokens(&self) -> &TokenConfig;
    fn db(&self) -> &Database;
}

/// Macro to implement `HasAuthState` for state structs with the standard
/// fields.
///
/// The struct must have these fields:
/// - `tokens: Arc<TokenConfig>`
/// - `db: Database`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_state;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub tokens: Arc<TokenConfig>,
///     // ... other fields
/// }
///
/// impl_has_auth_state!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_state {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthState for $state_type {
            fn tokens(&self) -> &$crate::token::TokenConfig {
                &self.tokens
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
        }
    };
}
