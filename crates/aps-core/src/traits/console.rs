//! Console transport traits

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::ConnectError;
use crate::types::Credentials;

/// One live interactive console on a controller.
///
/// Implementations deliver output as opaque chunks in arrival order; pacing
/// and prompt detection live in the driver layered on top.
#[async_trait]
pub trait RemoteConsole: Send {
    /// Send one line of input, terminated for the remote shell
    async fn send_line(&mut self, line: &str) -> Result<(), ConnectError>;

    /// Wait up to `wait` for the next chunk of output.
    ///
    /// Returns `Ok(None)` when the window lapses with nothing buffered.
    async fn read_chunk(&mut self, wait: Duration) -> Result<Option<Bytes>, ConnectError>;

    /// Close the console
    async fn close(&mut self) -> Result<(), ConnectError>;
}

/// Opens interactive consoles on controllers
#[async_trait]
pub trait ConsoleConnector: Send + Sync {
    /// Open a console on `address`
    async fn connect(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteConsole>, ConnectError>;
}
