//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default listening port
pub const DEFAULT_PORT: u16 = 3002;

/// Path downstream clients must request
pub const DEFAULT_RELAY_PATH: &str = "/ais";

/// Path answered with a JSON status document
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Close code sent to clients that request any other path
pub const WRONG_PATH_CLOSE_CODE: u16 = 4004;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// WebSocket path clients must connect to
    pub relay_path: String,

    /// Plain HTTP path serving health status
    pub health_path: String,

    /// Per-client queue depth; a client that falls this far behind is evicted
    pub client_queue_capacity: usize,

    /// A single socket write to a client must finish within this time
    pub send_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            relay_path: DEFAULT_RELAY_PATH.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            client_queue_capacity: 1024,
            send_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Bind to the given port on the loopback interface
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        self
    }

    /// Set per-client queue depth (at least 1)
    pub fn client_queue_capacity(mut self, capacity: usize) -> Self {
        self.client_queue_capacity = capacity.max(1);
        self
    }

    /// Set per-write timeout for client sockets
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Close reason sent alongside `WRONG_PATH_CLOSE_CODE`
    pub fn wrong_path_reason(&self) -> String {
        format!("Use path {}", self.relay_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 3002);
        assert!(config.bind_addr.ip().is_loopback());
        assert_eq!(config.relay_path, "/ais");
        assert_eq!(config.health_path, "/health");
        assert_eq!(config.client_queue_capacity, 1024);
        assert_eq!(config.send_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_wrong_path_reason() {
        assert_eq!(ServerConfig::default().wrong_path_reason(), "Use path /ais");
    }

    #[test]
    fn test_builder_port_stays_on_loopback() {
        let config = ServerConfig::default().port(4100);

        assert_eq!(config.bind_addr, "127.0.0.1:4100".parse().unwrap());
    }

    #[test]
    fn test_builder_queue_capacity_floor() {
        let config = ServerConfig::default().client_queue_capacity(0);

        assert_eq!(config.client_queue_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .client_queue_capacity(16)
            .send_timeout(Duration::from_millis(500));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.send_timeout, Duration::from_millis(500));
        assert_eq!(config.client_queue_capacity, 16);
    }
}
