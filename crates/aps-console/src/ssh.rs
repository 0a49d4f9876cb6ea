//! SSH transport for controller consoles
//!
//! Opens an interactive shell over SSH with password authentication and
//! exposes it through the [`RemoteConsole`] trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use russh::client::{self, Config, Handle, Msg};
use russh::{Channel, ChannelId, Disconnect};
use russh_keys::key::PublicKey;
use tokio::sync::mpsc;

use aps_core::error::ConnectError;
use aps_core::traits::{ConsoleConnector, RemoteConsole};
use aps_core::Credentials;

/// Channel capacity for shell output chunks.
///
/// This buffer holds output between the SSH data handler and the
/// driver's drain loop.
///
/// # Value Choice
///
/// 256 provides headroom for:
/// - Multi-screen command output arriving faster than the drain polls
/// - Settle windows where nothing reads the channel
///
/// Too small: Risk of stalling the SSH reader during large captures
/// Too large: Memory usage when a command floods output
const CONSOLE_CHUNK_CAPACITY: usize = 256;

/// Upper bound on establishing the SSH session
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Opens password-authenticated SSH shells on controllers
#[derive(Debug, Clone, Default)]
pub struct SshConnector;

impl SshConnector {
    /// Create a new connector
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConsoleConnector for SshConnector {
    async fn connect(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteConsole>, ConnectError> {
        let console = SshConsole::open(address, credentials).await?;
        Ok(Box::new(console))
    }
}

/// An interactive shell on one controller
pub struct SshConsole {
    session: Handle<ConsoleHandler>,
    channel: Channel<Msg>,
    chunk_rx: mpsc::Receiver<Bytes>,
    address: String,
}

impl SshConsole {
    /// Connect, authenticate, and start a shell on `address`
    async fn open(address: &str, credentials: &Credentials) -> Result<Self, ConnectError> {
        let ssh_config = Arc::new(Config::default());

        let (chunk_tx, chunk_rx) = mpsc::channel(CONSOLE_CHUNK_CAPACITY);
        let handler = ConsoleHandler { chunk_tx };

        // Bare addresses get the standard SSH port
        let target = if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:22", address)
        };

        tracing::debug!("Connecting to {}", target);
        let mut session = tokio::time::timeout(
            CONNECT_TIMEOUT,
            client::connect(ssh_config, &target, handler),
        )
        .await
        .map_err(|_| ConnectError::Unreachable {
            address: address.to_string(),
            detail: "connection timed out".to_string(),
        })?
        .map_err(|e| ConnectError::Unreachable {
            address: address.to_string(),
            detail: e.to_string(),
        })?;

        tracing::debug!("Authenticating as user '{}'", credentials.username);
        let authenticated = session
            .authenticate_password(&credentials.username, &credentials.password)
            .await
            .map_err(|e| ConnectError::Ssh(format!("authentication error: {}", e)))?;

        if !authenticated {
            return Err(ConnectError::AuthenticationFailed {
                address: address.to_string(),
            });
        }

        tracing::debug!("Authentication successful, opening shell channel");
        let channel = session
            .channel_open_session()
            .await
            .map_err(|e| ConnectError::Ssh(format!("failed to open session channel: {}", e)))?;

        // Controllers refuse shell requests without a pty
        channel
            .request_pty(false, "vt100", 80, 24, 0, 0, &[])
            .await
            .map_err(|e| ConnectError::Ssh(format!("failed to request pty: {}", e)))?;

        channel
            .request_shell(false)
            .await
            .map_err(|e| ConnectError::Ssh(format!("failed to start shell: {}", e)))?;

        Ok(Self {
            session,
            channel,
            chunk_rx,
            address: address.to_string(),
        })
    }

    /// Address this console is connected to
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl RemoteConsole for SshConsole {
    async fn send_line(&mut self, line: &str) -> Result<(), ConnectError> {
        let payload = format!("{}\n", line);
        self.channel
            .data(payload.as_bytes())
            .await
            .map_err(|e| ConnectError::ChannelClosed(e.to_string()))
    }

    async fn read_chunk(&mut self, wait: Duration) -> Result<Option<Bytes>, ConnectError> {
        match tokio::time::timeout(wait, self.chunk_rx.recv()).await {
            Ok(Some(chunk)) => Ok(Some(chunk)),
            Ok(None) => Err(ConnectError::ChannelClosed(
                "console output stream ended".to_string(),
            )),
            Err(_) => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        self.session
            .disconnect(Disconnect::ByApplication, "session finished", "en")
            .await
            .map_err(|e| ConnectError::Ssh(e.to_string()))
    }
}

/// SSH client handler that forwards shell output to the console reader
struct ConsoleHandler {
    chunk_tx: mpsc::Sender<Bytes>,
}

#[async_trait]
impl client::Handler for ConsoleHandler {
    type Error = russh::Error;

    /// Accept the controller's host key
    ///
    /// Controllers regenerate host keys on factory reset and lab fleets
    /// rarely ship known_hosts files, so the fingerprint is logged rather
    /// than pinned.
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!("Server host key: {}", server_public_key.fingerprint());
        Ok(true)
    }

    /// Forward shell output to the console reader
    async fn data(
        &mut self,
        _channel: ChannelId,
        data: &[u8],
        _session: &mut client::Session,
    ) -> Result<(), Self::Error> {
        let _ = self.chunk_tx.send(Bytes::copy_from_slice(data)).await;
        Ok(())
    }

    /// Handle channel close
    async fn channel_close(
        &mut self,
        _channel: ChannelId,
        _session: &mut client::Session,
    ) -> Result<(), Self::Error> {
        tracing::debug!("Console channel closed");
        Ok(())
    }
}
