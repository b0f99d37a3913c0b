//! Façade owning the live configuration and executor.
//!
//! An [`ApiManager`] holds exactly one `(config, executor)` pair at a time
//! behind an `Arc` that is swapped as a whole. Every call clones the current
//! pair before awaiting, so a call started before a swap finishes on the
//! executor it started with while new calls see the replacement.
//!
//! Applications that want a process-wide instance use [`global`],
//! [`init_global`] and [`dispose_global`]. Nothing else in the crate touches
//! the global.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::RwLock;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::connectivity::{AlwaysOnline, Connectivity};
use crate::envelope::Envelope;
use crate::error::{ConfigError, RequestError};
use crate::http::{RequestExecutor, RequestOptions, UploadFile};

struct ManagerState {
    config: Arc<ApiConfig>,
    executor: Arc<RequestExecutor>,
}

pub struct ApiManager {
    state: RwLock<Arc<ManagerState>>,
    connectivity: Arc<dyn Connectivity>,
}

impl ApiManager {
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        Self::with_connectivity(config, Arc::new(AlwaysOnline))
    }

    pub fn with_connectivity(
        config: ApiConfig,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self, ConfigError> {
        let state = build_state(config, connectivity.clone())?;
        Ok(Self {
            state: RwLock::new(Arc::new(state)),
            connectivity,
        })
    }

    /// Replaces the configuration and the executor built from it.
    pub fn initialize(&self, config: ApiConfig) -> Result<(), ConfigError> {
        let state = build_state(config, self.connectivity.clone())?;
        info!("API client initialized for {}", state.config.base_url());
        *self.state.write() = Arc::new(state);
        Ok(())
    }

    pub fn config(&self) -> Arc<ApiConfig> {
        self.state.read().config.clone()
    }

    pub fn executor(&self) -> Arc<RequestExecutor> {
        self.state.read().executor.clone()
    }

    /// Points the live executor at a new base URL without rebuilding it.
    pub fn update_base_url(&self, base_url: &str) -> Result<(), ConfigError> {
        let mut state = self.state.write();
        let config = state.config.with_base_url(base_url)?;
        let executor = state.executor.clone();
        executor.set_base_url(config.base_url())?;
        *state = Arc::new(ManagerState {
            config: Arc::new(config),
            executor,
        });
        debug!("Base URL updated to {}", state.config.base_url());
        Ok(())
    }

    /// Sets or clears the bearer token. Rebuilds the executor.
    pub fn update_auth_token(&self, token: Option<&str>) -> Result<(), ConfigError> {
        let mut state = self.state.write();
        let config = match token {
            Some(token) => state.config.with_auth_token(token),
            None => state.config.without_auth_token(),
        };
        *state = Arc::new(build_state(config, self.connectivity.clone())?);
        debug!("Auth token {}", if token.is_some() { "updated" } else { "cleared" });
        Ok(())
    }

    /// Adds headers to the live executor. The stored config is updated as well
    /// so the headers survive a later re-initialization.
    pub fn add_headers(&self, headers: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        let mut state = self.state.write();
        let executor = state.executor.clone();
        executor.add_headers(headers)?;
        let config = state.config.with_headers(headers.clone());
        *state = Arc::new(ManagerState {
            config: Arc::new(config),
            executor,
        });
        Ok(())
    }

    /// Removes every header from the live executor, defaults included.
    pub fn clear_headers(&self) {
        let mut state = self.state.write();
        let executor = state.executor.clone();
        executor.clear_headers();
        let config = state.config.without_headers();
        *state = Arc::new(ManagerState {
            config: Arc::new(config),
            executor,
        });
    }

    pub async fn is_connected(&self) -> bool {
        self.connectivity.is_connected().await
    }

    /// Re-initializes with [`ApiConfig::default`].
    pub fn reset(&self) -> Result<(), ConfigError> {
        self.initialize(ApiConfig::default())
    }

    pub fn use_development(&self) -> Result<(), ConfigError> {
        self.initialize(ApiConfig::development())
    }

    pub fn use_production(&self) -> Result<(), ConfigError> {
        self.initialize(ApiConfig::production())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Envelope<T>, RequestError> {
        self.executor()
            .execute_json(Method::GET, path, None, options)
            .await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Envelope<T>, RequestError> {
        self.executor()
            .execute_json(Method::POST, path, body, options)
            .await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Envelope<T>, RequestError> {
        self.executor()
            .execute_json(Method::PUT, path, body, options)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Envelope<T>, RequestError> {
        self.executor()
            .execute_json(Method::DELETE, path, body, options)
            .await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Envelope<T>, RequestError> {
        self.executor()
            .execute_json(Method::PATCH, path, body, options)
            .await
    }

    /// Any method with a caller-supplied payload decoder.
    pub async fn request<T, F>(
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
        self.executor()
            .execute(method, path, body, options, decode)
            .await
    }

    /// Any method, ignoring whatever payload the server sends back.
    pub async fn request_without_result<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<Envelope<T>, RequestError> {
        self.executor()
            .execute_without_result(method, path, body, options)
            .await
    }

    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file: &UploadFile<'_>,
        options: &RequestOptions,
    ) -> Result<Envelope<T>, RequestError> {
        self.executor()
            .upload(path, file, options, |data| Ok(serde_json::from_value(data)?))
            .await
    }
}

fn build_state(
    config: ApiConfig,
    connectivity: Arc<dyn Connectivity>,
) -> Result<ManagerState, ConfigError> {
    let config = Arc::new(config);
    let executor = RequestExecutor::new(config.clone(), connectivity)?;
    Ok(ManagerState {
        config,
        executor: Arc::new(executor),
    })
}

static GLOBAL: RwLock<Option<Arc<ApiManager>>> = RwLock::new(None);

/// The process-wide manager, created with [`ApiConfig::default`] on first use
/// or after [`dispose_global`].
pub fn global() -> Result<Arc<ApiManager>, ConfigError> {
    if let Some(manager) = GLOBAL.read().as_ref() {
        return Ok(manager.clone());
    }

    let mut slot = GLOBAL.write();
    if let Some(manager) = slot.as_ref() {
        return Ok(manager.clone());
    }
    let manager = Arc::new(ApiManager::new(ApiConfig::default())?);
    *slot = Some(manager.clone());
    Ok(manager)
}

/// Installs `config` on the process-wide manager, creating it if needed.
pub fn init_global(config: ApiConfig) -> Result<Arc<ApiManager>, ConfigError> {
    let mut slot = GLOBAL.write();
    match slot.as_ref() {
        Some(manager) => {
            manager.initialize(config)?;
            Ok(manager.clone())
        }
        None => {
            let manager = Arc::new(ApiManager::new(config)?);
            *slot = Some(manager.clone());
            Ok(manager)
        }
    }
}

/// Drops the process-wide manager. Handles already obtained stay usable;
/// the next [`global`] call creates a fresh default instance.
pub fn dispose_global() {
    if GLOBAL.write().take().is_some() {
        debug!("Global API manager disposed");
    }
}
