//! Request-time hooks.
//!
//! Interceptors run on every outgoing request after it has been fully built,
//! and observe its outcome.

use log::{debug, info, warn};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, StatusCode};

use crate::error::ApiError;

pub trait Interceptor: Send + Sync {
    fn on_request(&self, _request: &mut Request) {}

    fn on_response(&self, _request: &RequestSummary, _status: StatusCode) {}

    fn on_error(&self, _request: &RequestSummary, _error: &ApiError) {}
}

/// What interceptors see of a request once it has been sent.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub method: reqwest::Method,
    pub url: String,
}

impl RequestSummary {
    pub fn of(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().to_string(),
        }
    }
}

/// Adds `Authorization: Bearer <token>` to every request.
pub struct AuthInterceptor {
    header: Option<HeaderValue>,
}

impl AuthInterceptor {
    pub fn new(token: &str) -> Self {
        let header = match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                Some(value)
            }
            Err(e) => {
                warn!("Ignoring auth token that is not a valid header value: {}", e);
                None
            }
        };
        Self { header }
    }
}

impl Interceptor for AuthInterceptor {
    fn on_request(&self, request: &mut Request) {
        if let Some(header) = &self.header {
            request.headers_mut().insert(AUTHORIZATION, header.clone());
        }
    }
}

/// Logs each request, its response status and any classified error.
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn on_request(&self, request: &mut Request) {
        info!("--> {} {}", request.method(), request.url());
        for (name, value) in request.headers() {
            if value.is_sensitive() {
                debug!("    {}: <redacted>", name);
            } else {
                debug!("    {}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
        }
    }

    fn on_response(&self, request: &RequestSummary, status: StatusCode) {
        info!("<-- {} {} {}", status.as_u16(), request.method, request.url);
    }

    fn on_error(&self, request: &RequestSummary, error: &ApiError) {
        warn!("<-- {} {} failed: {}", request.method, request.url, error);
    }
}
