//! Scripted fakes shared by the workflow tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use aps_core::error::{ConnectError, DirectoryError};
use aps_core::traits::{
    ConsoleConnector, FallbackChoice, FleetDirectory, ProfileAdvisor, RemoteConsole,
};
use aps_core::types::{ClusterMembership, Controller, ControllerId};
use aps_core::{Credentials, NodePath};

/// Responder reply that makes the console fail the send
pub const FAIL: &str = "<<fail>>";

type Responder = dyn Fn(&str, &str) -> String + Send + Sync;
type SendLog = Arc<Mutex<Vec<(String, String)>>>;

pub fn creds() -> Credentials {
    Credentials::new("admin", "secret")
}

pub fn controller(id: i64, name: &str, address: &str, node_path: &str) -> Controller {
    Controller {
        id: ControllerId::new(id),
        address: address.to_string(),
        name: name.to_string(),
        node_path: NodePath::new(node_path),
        model: None,
        version: None,
    }
}

/// Console that answers every sent line through a scripted responder
struct FakeConsole {
    address: String,
    responder: Arc<Responder>,
    pending: VecDeque<Bytes>,
    log: SendLog,
}

#[async_trait]
impl RemoteConsole for FakeConsole {
    async fn send_line(&mut self, line: &str) -> Result<(), ConnectError> {
        self.log
            .lock()
            .unwrap()
            .push((self.address.clone(), line.to_string()));
        let reply = (self.responder)(&self.address, line);
        if reply == FAIL {
            return Err(ConnectError::ChannelClosed("scripted failure".to_string()));
        }
        self.pending.push_back(Bytes::from(reply));
        Ok(())
    }

    async fn read_chunk(&mut self, wait: Duration) -> Result<Option<Bytes>, ConnectError> {
        match self.pending.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        Ok(())
    }
}

/// Connector handing out scripted consoles, with optional refused addresses
pub struct FakeConnector {
    responder: Arc<Responder>,
    refused: Vec<String>,
    log: SendLog,
}

impl FakeConnector {
    pub fn new(responder: impl Fn(&str, &str) -> String + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            refused: Vec::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Refuse console connections to `address`
    pub fn refuse(mut self, address: &str) -> Self {
        self.refused.push(address.to_string());
        self
    }

    /// Every line sent through any console, as (address, line)
    pub fn sent(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().clone()
    }

    /// Lines sent to one address, in order
    pub fn sent_to(&self, address: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(a, _)| a == address)
            .map(|(_, line)| line)
            .collect()
    }
}

#[async_trait]
impl ConsoleConnector for FakeConnector {
    async fn connect(
        &self,
        address: &str,
        _credentials: &Credentials,
    ) -> Result<Box<dyn RemoteConsole>, ConnectError> {
        if self.refused.iter().any(|a| a == address) {
            return Err(ConnectError::Unreachable {
                address: address.to_string(),
                detail: "refused by test".to_string(),
            });
        }
        Ok(Box::new(FakeConsole {
            address: address.to_string(),
            responder: Arc::clone(&self.responder),
            pending: VecDeque::new(),
            log: Arc::clone(&self.log),
        }))
    }
}

/// Advisor that replays scripted fallback choices
pub struct ScriptedAdvisor {
    choices: Mutex<VecDeque<FallbackChoice>>,
    accept: bool,
}

impl ScriptedAdvisor {
    pub fn new(choices: impl IntoIterator<Item = FallbackChoice>, accept: bool) -> Self {
        Self {
            choices: Mutex::new(choices.into_iter().collect()),
            accept,
        }
    }

    pub fn aborting() -> Self {
        Self::new([FallbackChoice::Abort], false)
    }
}

impl ProfileAdvisor for ScriptedAdvisor {
    fn advise(&self, _host: &str, _rejected: &str) -> FallbackChoice {
        self.choices
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FallbackChoice::Abort)
    }

    fn accept_discovered(&self, _host: &str, _discovered: &str) -> bool {
        self.accept
    }
}

/// Directory with fixed cluster and node-path data
pub struct FakeDirectory {
    pub pairs: Vec<(String, NodePath)>,
}

impl FleetDirectory for FakeDirectory {
    fn controllers(&self) -> Result<Vec<Controller>, DirectoryError> {
        Ok(Vec::new())
    }

    fn membership(
        &self,
        _controller: ControllerId,
    ) -> Result<Option<ClusterMembership>, DirectoryError> {
        Ok(None)
    }

    fn selectable_clusters(&self) -> Result<Vec<String>, DirectoryError> {
        Ok(self.pairs.iter().map(|(name, _)| name.clone()).collect())
    }

    fn cluster_members(&self, cluster: &str) -> Result<Vec<Controller>, DirectoryError> {
        Err(DirectoryError::UnknownCluster(cluster.to_string()))
    }

    fn clusters_for_node_path(&self, path: &NodePath) -> Result<Vec<String>, DirectoryError> {
        Ok(self
            .pairs
            .iter()
            .filter(|(_, p)| p == path)
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn cluster_node_paths(&self) -> Result<Vec<(String, NodePath)>, DirectoryError> {
        Ok(self.pairs.clone())
    }

    fn ap_groups_for(&self, _controller: ControllerId) -> Result<Vec<String>, DirectoryError> {
        Ok(Vec::new())
    }
}
