pub mod refresh;
pub mod signout;

// Re-export so we can do "use crate::auth::*;"
pub use refresh::{RefreshCoordinator, RefreshError};
pub use signout::{NoopHooks, SignOut, SignOutHooks, SignOutReason, SignOutReport};
