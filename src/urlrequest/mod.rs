//! Request dispatch and the callback lifecycle.
//!
//! - [`request`]: the request description
//! - [`handle`] / [`registry`]: cancellation, single and by tag
//! - [`handler`] / [`adapters`]: the callback contract and ready-made handlers
//! - [`executor`]: where callbacks run
//! - [`context`]: shared client state and `submit`

pub mod adapters;
pub mod context;
pub mod executor;
pub mod handle;
pub mod handler;
mod job;
mod lifecycle;
mod pool;
pub mod registry;
pub mod request;

pub use adapters::{
    BinaryResponseHandler, FileResponseHandler, JsonResponseHandler, TextResponseHandler,
};
pub use context::{RequestContext, RequestContextConfig, DEFAULT_USER_AGENT};
pub use executor::{CallbackExecutor, CallbackQueue, Inline, SerialExecutor, Task};
pub use handle::RequestHandle;
pub use handler::{FnHandler, ResponseHandler};
pub use registry::RequestRegistry;
pub use request::{Request, RequestOverrides};
