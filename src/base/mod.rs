//! Base types and error handling.
//!
//! - [`NetError`]: error codes and their [`ErrorKind`] categories
//! - [`RequestState`]: the states a request handle moves through

pub mod context;
pub mod loadstate;
pub mod neterror;

pub use loadstate::RequestState;
pub use neterror::{ErrorKind, NetError};
