//! Broker connection lifecycle management

use lapin::{Channel, Connection, ConnectionProperties};
use tokio::sync::Mutex;
use tracing::{info, warn};

use herald_core::HeraldError;

use crate::config::RabbitConfig;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

struct Inner {
    state: ConnectionState,
    connection: Option<Connection>,
    channel: Option<Channel>,
}

/// Explicit process-wide handle to the publish-side broker connection.
///
/// Constructed once at process start and shared by `Arc`; there is no
/// hidden global. Owns a single connection and channel used for topology
/// setup and publishing. The consumer supervisor opens its own dedicated
/// connection (see [`crate::consumer`]), so publishing never contends
/// with the consume loop.
pub struct ConnectionManager {
    config: RabbitConfig,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    /// Create a manager in the `Disconnected` state. No I/O happens
    /// until [`connect`](Self::connect) or
    /// [`ensure_connection`](Self::ensure_connection) is called.
    pub fn new(config: RabbitConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                connection: None,
                channel: None,
            }),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Establish the connection and channel, with bounded retries.
    ///
    /// Moves `Disconnected -> Connecting -> Connected` on success, back
    /// to `Disconnected` when all attempts are exhausted.
    pub async fn connect(&self) -> Result<(), HeraldError> {
        let mut inner = self.inner.lock().await;
        connect_locked(&self.config, &mut inner).await
    }

    /// Idempotent connect: returns immediately when already connected,
    /// otherwise performs a full [`connect`](Self::connect).
    pub async fn ensure_connection(&self) -> Result<(), HeraldError> {
        let mut inner = self.inner.lock().await;
        ensure_locked(&self.config, &mut inner).await
    }

    /// Clone of the publish channel, connecting first if needed.
    pub async fn channel(&self) -> Result<Channel, HeraldError> {
        let mut inner = self.inner.lock().await;
        ensure_locked(&self.config, &mut inner).await?;
        inner
            .channel
            .clone()
            .ok_or_else(|| HeraldError::Connection("no open channel".to_string()))
    }

    /// Close the transport, best-effort.
    ///
    /// Never errors: close failures are logged and the state is reset to
    /// `Disconnected` unconditionally.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;

        if let Some(channel) = inner.channel.take() {
            if let Err(e) = channel.close(200, "Normal shutdown").await {
                warn!(error = %e, "Failed to close channel gracefully");
            }
        }

        if let Some(connection) = inner.connection.take() {
            if let Err(e) = connection.close(200, "Normal shutdown").await {
                warn!(error = %e, "Failed to close connection gracefully");
            }
        }

        inner.state = ConnectionState::Disconnected;
        info!("Connection closed");
    }
}

async fn ensure_locked(config: &RabbitConfig, inner: &mut Inner) -> Result<(), HeraldError> {
    if inner.state == ConnectionState::Connected {
        match &inner.connection {
            Some(connection) if connection.status().connected() => return Ok(()),
            _ => {
                warn!("Connection lost, reconnecting");
                inner.state = ConnectionState::Disconnected;
            }
        }
    }
    connect_locked(config, inner).await
}

async fn connect_locked(config: &RabbitConfig, inner: &mut Inner) -> Result<(), HeraldError> {
    inner.state = ConnectionState::Connecting;

    match open(config).await {
        Ok((connection, channel)) => {
            inner.connection = Some(connection);
            inner.channel = Some(channel);
            inner.state = ConnectionState::Connected;
            Ok(())
        }
        Err(e) => {
            inner.connection = None;
            inner.channel = None;
            inner.state = ConnectionState::Disconnected;
            Err(e)
        }
    }
}

/// Open a fresh connection and channel, retrying up to the configured
/// attempt count with a fixed delay between attempts. Also used by the
/// consumer supervisor for its dedicated connection.
pub(crate) async fn open(config: &RabbitConfig) -> Result<(Connection, Channel), HeraldError> {
    let uri = config.amqp_uri();
    let mut attempt = 0;

    let connection = loop {
        attempt += 1;
        match Connection::connect(&uri, ConnectionProperties::default()).await {
            Ok(connection) => break connection,
            Err(e) => {
                if attempt >= config.connection_attempts {
                    return Err(HeraldError::Connection(format!(
                        "connection failed after {} attempts: {}",
                        attempt, e
                    )));
                }
                warn!(
                    attempt,
                    max_attempts = config.connection_attempts,
                    error = %e,
                    "Connection attempt failed, retrying"
                );
                tokio::time::sleep(std::time::Duration::from_secs(config.retry_delay_seconds))
                    .await;
            }
        }
    };

    let channel = connection
        .create_channel()
        .await
        .map_err(|e| HeraldError::Connection(format!("channel creation failed: {}", e)))?;

    info!(host = %config.host, port = config.port, "Connected to RabbitMQ");

    Ok((connection, channel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_manager_starts_disconnected() {
        let manager = ConnectionManager::new(RabbitConfig::default());
        assert_eq!(manager.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn failed_connect_resets_to_disconnected() {
        // Port 1 is closed; a single attempt fails fast.
        let config = RabbitConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connection_attempts: 1,
            retry_delay_seconds: 0,
            ..RabbitConfig::default()
        };

        let manager = ConnectionManager::new(config);
        assert!(manager.connect().await.is_err());
        assert_eq!(manager.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn close_without_connection_is_a_noop() {
        let manager = ConnectionManager::new(RabbitConfig::default());
        manager.close().await;
        assert_eq!(manager.state().await, ConnectionState::Disconnected);
    }
}
