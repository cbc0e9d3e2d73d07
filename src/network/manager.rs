//! Connection Manager
//!
//! Explicit provider of connections keyed by endpoint. A client is built
//! from the manager instead of reaching into a process-wide registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Connection, Endpoint, SocketOptions, Transport};

/// A connection that may be handed to several clients
///
/// Clients lock it for a whole send/decode cycle, so replies never
/// interleave between callers.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Hands out one connection per endpoint
pub struct ConnectionManager {
    options: SocketOptions,
    connections: Mutex<HashMap<Endpoint, SharedConnection>>,
}

impl ConnectionManager {
    pub fn new(options: SocketOptions) -> Self {
        Self {
            options,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Return the connection for `endpoint`, creating it on first use
    ///
    /// The connection is created disconnected and opens on first send.
    pub fn get_connection(&self, endpoint: &Endpoint) -> SharedConnection {
        let mut connections = self.connections.lock();
        if let Some(conn) = connections.get(endpoint) {
            return Arc::clone(conn);
        }

        tracing::debug!("Registering connection for {}", endpoint);
        let conn = Arc::new(Mutex::new(Connection::new(endpoint.clone(), self.options)));
        connections.insert(endpoint.clone(), Arc::clone(&conn));
        conn
    }

    /// All connections the manager knows about
    pub fn connections(&self) -> Vec<SharedConnection> {
        self.connections.lock().values().cloned().collect()
    }

    /// Number of registered endpoints
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// Close every managed socket; the connections stay registered
    pub fn disconnect_all(&self) {
        for conn in self.connections() {
            conn.lock().disconnect();
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(SocketOptions::default())
    }
}
