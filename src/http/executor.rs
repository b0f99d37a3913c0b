//! Performs one API call end to end.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::classify::{classify_response, classify_transport};
use super::interceptor::{AuthInterceptor, Interceptor, LoggingInterceptor, RequestSummary};
use super::retry::{is_idempotent, with_retry};
use crate::config::ApiConfig;
use crate::connectivity::Connectivity;
use crate::envelope::Envelope;
use crate::error::{ApiError, ConfigError, ErrorKind, RequestError};

/// Per-call inputs besides method, path and body.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// A file to send as one part of a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile<'a> {
    pub path: &'a Path,
    pub field_name: &'a str,
    pub fields: BTreeMap<String, String>,
}

impl<'a> UploadFile<'a> {
    pub fn new(path: &'a Path, field_name: &'a str) -> Self {
        Self {
            path,
            field_name,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Runs requests against one base URL with one set of headers and hooks.
///
/// Base URL and headers can be changed in place; a request picks up the
/// values current when it is built, so calls already in flight are not
/// affected.
pub struct RequestExecutor {
    client: Client,
    config: Arc<ApiConfig>,
    connectivity: Arc<dyn Connectivity>,
    base_url: RwLock<String>,
    headers: RwLock<HeaderMap>,
    interceptors: RwLock<Vec<Arc<dyn Interceptor>>>,
}

impl RequestExecutor {
    pub fn new(
        config: Arc<ApiConfig>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(concat!("apikit/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.receive_timeout)
            .timeout(config.total_timeout())
            .build()
            .map_err(|e| ConfigError::ClientBuild(e.to_string()))?;

        let headers = header_map(&config.headers)?;

        let mut interceptors: Vec<Arc<dyn Interceptor>> = Vec::new();
        if let Some(token) = &config.auth_token {
            interceptors.push(Arc::new(AuthInterceptor::new(token)));
        }
        if config.enable_logging {
            interceptors.push(Arc::new(LoggingInterceptor));
        }

        Ok(Self {
            client,
            base_url: RwLock::new(config.base_url().to_string()),
            config,
            connectivity,
            headers: RwLock::new(headers),
            interceptors: RwLock::new(interceptors),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn base_url(&self) -> String {
        self.base_url.read().clone()
    }

    pub fn set_base_url(&self, base_url: &str) -> Result<(), ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        *self.base_url.write() = trimmed.to_string();
        Ok(())
    }

    pub fn headers(&self) -> HeaderMap {
        self.headers.read().clone()
    }

    pub fn add_headers(&self, extra: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        let extra = header_map(extra)?;
        self.headers.write().extend(extra);
        Ok(())
    }

    pub fn clear_headers(&self) {
        self.headers.write().clear();
    }

    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.write().push(interceptor);
    }

    pub async fn is_connected(&self) -> bool {
        self.connectivity.is_connected().await
    }

    /// Executes a request and decodes `Data` with `decode`.
    #[tracing::instrument(skip(self, body, options, decode))]
    pub async fn execute<T, F>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
        decode: F,
    ) -> Result<Envelope<T>, RequestError>
    where
        F: FnOnce(Value) -> anyhow::Result<T>,
    {
        let json = self.dispatch(method, path, body, options).await?;
        Envelope::from_json(&json, decode).map_err(RequestError::Decode)
    }

    /// [`RequestExecutor::execute`] decoding `Data` with serde.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Envelope<T>, RequestError> {
        self.execute(method, path, body, options, |data| {
            Ok(serde_json::from_value(data)?)
        })
        .await
    }

    /// Executes a request whose payload the caller does not need; `data` is
    /// always `None`.
    pub async fn execute_without_result<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Envelope<T>, RequestError> {
        let json = self.dispatch(method, path, body, options).await?;
        Ok(Envelope::from_json_without_result(&json))
    }

    /// Sends `file` as a multipart POST. Uploads are never retried.
    #[tracing::instrument(skip(self, file, options, decode), fields(file = %file.path.display()))]
    pub async fn upload<T, F>(
        &self,
        path: &str,
        file: &UploadFile<'_>,
        options: &RequestOptions,
        decode: F,
    ) -> Result<Envelope<T>, RequestError>
    where
        F: FnOnce(Value) -> anyhow::Result<T>,
    {
        self.ensure_connected().await?;

        let bytes = tokio::fs::read(file.path).await.map_err(|e| {
            ApiError::new(
                ErrorKind::Unknown,
                format!("Failed to read {}: {}", file.path.display(), e),
            )
        })?;
        let file_name = file
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        let mut form = Form::new().part(
            file.field_name.to_string(),
            Part::bytes(bytes).file_name(file_name),
        );
        for (name, value) in &file.fields {
            form = form.text(name.clone(), value.clone());
        }

        // reqwest sets its own multipart content type with the boundary
        let mut headers = self.headers();
        headers.remove(reqwest::header::CONTENT_TYPE);

        let builder = self
            .client
            .post(self.url_for(path))
            .headers(headers)
            .headers(call_headers(options)?)
            .query(&options.query)
            .multipart(form);

        let json = self.send(builder, options.cancel.as_ref()).await?;
        Envelope::from_json(&json, decode).map_err(RequestError::Decode)
    }

    /// Connectivity check, then the transport call (retried when allowed).
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Value, ApiError> {
        self.ensure_connected().await?;

        let extra_headers = call_headers(options)?;
        let build = || {
            let mut builder = self
                .client
                .request(method.clone(), self.url_for(path))
                .headers(self.headers())
                .headers(extra_headers.clone())
                .query(&options.query);
            if let Some(body) = body {
                builder = builder.json(body);
            }
            builder
        };

        let operation_name = format!("{} {}", method, path);
        if self.config.enable_retry && is_idempotent(&method) {
            let cancel = options.cancel.as_ref();
            with_retry(&operation_name, self.config.retry, cancel, || {
                self.send(build(), cancel)
            })
            .await
        } else {
            self.send(build(), options.cancel.as_ref()).await
        }
    }

    async fn ensure_connected(&self) -> Result<(), ApiError> {
        if self.connectivity.is_connected().await {
            Ok(())
        } else {
            debug!("No connectivity, skipping request");
            Err(ApiError::no_connection())
        }
    }

    /// One attempt: run interceptors, send, and turn the response into JSON
    /// or a classified error.
    async fn send(
        &self,
        builder: RequestBuilder,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ApiError> {
        let mut request = builder.build().map_err(|e| classify_transport(&e))?;
        let interceptors = self.interceptors.read().clone();
        for interceptor in &interceptors {
            interceptor.on_request(&mut request);
        }
        let summary = RequestSummary::of(&request);

        let result = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ApiError::cancelled()),
                    result = self.round_trip(request) => result,
                }
            }
            None => self.round_trip(request).await,
        };

        match &result {
            Ok((status, _)) => {
                for interceptor in &interceptors {
                    interceptor.on_response(&summary, *status);
                }
            }
            Err(e) => {
                for interceptor in &interceptors {
                    interceptor.on_error(&summary, e);
                }
            }
        }
        result.map(|(_, json)| json)
    }

    async fn round_trip(
        &self,
        request: reqwest::Request,
    ) -> Result<(reqwest::StatusCode, Value), ApiError> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| classify_transport(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| classify_transport(&e))?;

        if !status.is_success() {
            return Err(classify_response(status.as_u16(), &body));
        }

        if body.trim().is_empty() {
            return Ok((status, Value::Null));
        }
        let json = serde_json::from_str(&body).map_err(|e| {
            ApiError::new(ErrorKind::Unknown, format!("Invalid JSON response: {}", e))
                .with_status(status.as_u16())
        })?;
        Ok((status, json))
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base_url = self.base_url.read();
        if path.is_empty() {
            base_url.clone()
        } else {
            format!("{}/{}", base_url, path.trim_start_matches('/'))
        }
    }
}

fn call_headers(options: &RequestOptions) -> Result<HeaderMap, ApiError> {
    header_map(&options.headers).map_err(|e| ApiError::new(ErrorKind::Unknown, e.to_string()))
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
