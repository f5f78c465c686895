//! Connection factory spawning one backend process per connection.

use std::sync::Arc;

use bridge_client::{Connection, ConnectionError, ConnectionFactory};

use crate::config::ServerConfig;
use crate::connection::StdioConnection;

/// Spawns a fresh backend process for every connection the bridge opens.
#[derive(Debug, Clone)]
pub struct StdioConnectionFactory {
    config: ServerConfig,
}

impl StdioConnectionFactory {
    /// Builds a factory for one backend configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

impl ConnectionFactory for StdioConnectionFactory {
    fn create_connection(&self) -> Result<Arc<dyn Connection>, ConnectionError> {
        let connection = StdioConnection::spawn(&self.config)?;
        Ok(Arc::new(connection))
    }
}
