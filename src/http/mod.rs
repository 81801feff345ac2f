//! HTTP building blocks: bodies, headers, responses, retry and transport.

pub mod h1transport;
pub mod multipart;
pub mod orderedheaders;
pub mod requestbody;
pub mod response;
pub mod retry;
pub mod transport;

// Re-exports for convenience
pub use h1transport::H1Transport;
pub use orderedheaders::OrderedHeaderMap;
#[cfg(feature = "json")]
pub use requestbody::JsonBody;
pub use requestbody::{BodyEncoder, FormBody, RequestBody};
pub use response::HttpResponse;
pub use retry::{Backoff, RetryCause, RetryDecision, RetryPolicy};
pub use transport::{Executing, ProgressSink, Transport};
