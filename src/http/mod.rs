//! HTTP execution: classification, retry, interceptors and the request executor.

mod classify;
mod executor;
mod interceptor;
mod retry;

pub use classify::{classify_response, classify_transport};
pub use executor::{RequestExecutor, RequestOptions, UploadFile};
pub use interceptor::{AuthInterceptor, Interceptor, LoggingInterceptor, RequestSummary};
pub use reqwest::Method;
pub use retry::{is_idempotent, with_retry};
pub use tokio_util::sync::CancellationToken;
