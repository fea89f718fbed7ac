//! services/api/src/adapters/connectivity.rs
//!
//! Checks whether the AI service is reachable before a generation run starts.

use async_trait::async_trait;
use std::time::Duration;
use tax_blog_core::ports::ConnectivityProbe;
use tokio::net::TcpStream;
use tracing::debug;

/// Reports online when a TCP connection to `addr` opens within `timeout`.
#[derive(Clone, Debug)]
pub struct TcpConnectivityProbe {
    addr: String,
    timeout: Duration,
}

impl TcpConnectivityProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpConnectivityProbe {
    async fn is_online(&self) -> bool {
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
