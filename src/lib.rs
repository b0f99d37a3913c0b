//! Convenience layer over `reqwest` for JSON REST backends.
//!
//! - [`config`]: immutable client settings and presets
//! - [`error`]: the closed error taxonomy and classified errors
//! - [`envelope`]: the `ResponseStatus / Data` response envelope
//! - [`pagination`]: alias-tolerant pagination metadata
//! - [`connectivity`]: reachability checks run before each request
//! - [`http`]: classification, retry, interceptors and the request executor
//! - [`manager`]: the façade holding the live config/executor pair

pub mod config;
pub mod connectivity;
pub mod envelope;
pub mod error;
pub mod http;
pub mod manager;
pub mod pagination;

pub use config::{ApiConfig, RetryPolicy};
pub use connectivity::{AlwaysOnline, Connectivity, TcpProbe};
pub use envelope::{Envelope, ResponseStatus};
pub use error::{ApiError, ConfigError, ErrorKind, RequestError};
pub use http::{CancellationToken, Method, RequestExecutor, RequestOptions, UploadFile};
pub use manager::ApiManager;
pub use pagination::{Paginated, Pagination};
