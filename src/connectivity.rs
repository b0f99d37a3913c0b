//! Network reachability checks run before every request.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::net::TcpStream;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Assumes the network is always reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

#[async_trait]
impl Connectivity for AlwaysOnline {
    async fn is_connected(&self) -> bool {
        true
    }
}

/// Reports connectivity by opening a TCP connection to a well-known address.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new("1.1.1.1:443", Duration::from_secs(3))
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    #[tracing::instrument(skip(self), fields(addr = %self.addr))]
    async fn is_connected(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Connectivity probe to {} failed: {}", self.addr, e);
                false
            }
            Err(_) => {
                debug!("Connectivity probe to {} timed out", self.addr);
                false
            }
        }
    }
}
