//! Credentials and preemptive authentication.
//!
//! - [`authcache`]: host+port scoped credential store
//! - [`preemptive`]: attaches stored credentials before the first round trip

pub mod authcache;
pub mod preemptive;

pub use authcache::{AuthCache, AuthEntry, AuthScheme, CredentialStore};
pub use preemptive::PreemptiveAuthInterceptor;
