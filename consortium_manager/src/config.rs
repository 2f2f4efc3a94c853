// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! The static description of a network: its organizations, their CAs, users and nodes.
//!
//! The description is a JSON document. Relative paths in it are resolved against a data root,
//! which defaults to the directory holding the document.

use crate::error::{Error, Result};
use consortium_identity::{liveness::DEFAULT_WAIT, Secret, TlsLayout};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_CA_PORT: u16 = 7054;
pub const DEFAULT_CHANNEL_NAME: &str = "mychannel";
pub const DEFAULT_SYSTEM_CHANNEL_NAME: &str = "systemchannel";
pub const DEFAULT_CONSORTIUM: &str = "SampleConsortium";

fn default_ca_port() -> u16 {
    DEFAULT_CA_PORT
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_wait_secs() -> u64 {
    DEFAULT_WAIT.as_secs()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgKind {
    Peer,
    Orderer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaConfig {
    pub name: String,
    pub host: String,
    #[serde(default = "default_ca_port")]
    pub port: u16,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Where the CA publishes its root certificate.
    pub certfile: PathBuf,
    /// How long to wait for the CA to come up.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
}

impl CaConfig {
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn uses_tls(&self) -> bool {
        self.scheme == "https"
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    pub pass: Secret,
    pub home: PathBuf,
}

impl UserConfig {
    pub fn msp_dir(&self) -> PathBuf {
        self.home.join("msp")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersConfig {
    /// The identity the CA was started with.
    pub bootstrap_admin: UserConfig,
    pub admin: UserConfig,
    /// Peer organizations also provision an ordinary user.
    #[serde(default)]
    pub user: Option<UserConfig>,
}

/// File names of one TLS certificate set, inside a sub-directory of a node's TLS directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsFiles {
    pub dir: String,
    pub cert: String,
    pub key: String,
    pub ca: String,
}

impl TlsFiles {
    fn named(prefix: &str) -> Self {
        Self {
            dir: prefix.to_string(),
            cert: format!("{prefix}.crt"),
            key: format!("{prefix}.key"),
            ca: format!("{prefix}-ca.pem"),
        }
    }

    fn server() -> Self {
        Self::named("server")
    }

    fn client() -> Self {
        Self::named("client")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default = "TlsFiles::server")]
    pub server: TlsFiles,
    #[serde(default = "TlsFiles::client")]
    pub client: TlsFiles,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            server: TlsFiles::server(),
            client: TlsFiles::client(),
        }
    }
}

/// A peer or an orderer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    pub pass: Secret,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub anchor: bool,
    pub tls_dir: PathBuf,
}

impl NodeConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgConfig {
    pub name: String,
    pub msp_id: String,
    pub kind: OrgKind,
    pub ca: CaConfig,
    pub users: UsersConfig,
    /// Parent of the nodes' local MSP directories.
    pub core_dir: PathBuf,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

impl OrgConfig {
    pub fn admin_msp_dir(&self) -> PathBuf {
        self.users.admin.msp_dir()
    }

    pub fn node_msp_dir(&self, node: &NodeConfig) -> PathBuf {
        self.core_dir.join(&node.name).join("msp")
    }

    pub fn anchor_peer(&self) -> Option<&NodeConfig> {
        self.nodes.iter().find(|node| node.anchor)
    }

    /// Where the server (inbound) TLS material of `node` is written.
    pub fn server_tls(&self, node: &NodeConfig) -> TlsLayout {
        tls_layout(node, &self.tls.server)
    }

    /// Where the client (outbound) TLS material of `node` is written.
    pub fn client_tls(&self, node: &NodeConfig) -> TlsLayout {
        tls_layout(node, &self.tls.client)
    }

    fn resolve_paths(&mut self, root: &Path) {
        resolve(&mut self.ca.certfile, root);
        resolve(&mut self.core_dir, root);
        for user in [&mut self.users.bootstrap_admin, &mut self.users.admin]
            .into_iter()
            .chain(self.users.user.as_mut())
        {
            resolve(&mut user.home, root);
        }
        for node in &mut self.nodes {
            resolve(&mut node.tls_dir, root);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.msp_id.trim().is_empty() {
            return Err(invalid(format!("'{}' has an empty mspid", self.name)));
        }
        if self.ca.port == 0 {
            return Err(invalid(format!("the CA of '{}' has port 0", self.name)));
        }
        let mut names = BTreeSet::new();
        for node in &self.nodes {
            if !names.insert(node.name.as_str()) {
                return Err(invalid(format!(
                    "'{}' declares node '{}' twice",
                    self.name, node.name
                )));
            }
            if node.port == 0 {
                return Err(invalid(format!("node '{}' has port 0", node.name)));
            }
        }

        let anchors = self.nodes.iter().filter(|node| node.anchor).count();
        match self.kind {
            OrgKind::Peer => {
                if anchors != 1 {
                    return Err(invalid(format!(
                        "peer organization '{}' must nominate exactly one anchor peer, found {anchors}",
                        self.name
                    )));
                }
                if self.users.user.is_none() {
                    return Err(invalid(format!(
                        "peer organization '{}' has no user",
                        self.name
                    )));
                }
            }
            OrgKind::Orderer if anchors > 0 => {
                return Err(invalid(format!(
                    "orderer organization '{}' cannot nominate anchor peers",
                    self.name
                )));
            }
            OrgKind::Orderer => {}
        }
        Ok(())
    }
}

fn tls_layout(node: &NodeConfig, files: &TlsFiles) -> TlsLayout {
    TlsLayout {
        dir: node.tls_dir.join(&files.dir),
        cert_file: files.cert.clone(),
        key_file: files.key.clone(),
        ca_file: files.ca.clone(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiscConfig {
    pub channel_name: String,
    pub system_channel_name: String,
    pub consortium: String,
    /// The ordering gateway. Without it the channel workflows run against an in-memory ordering
    /// service bootstrapped from the trust stores.
    pub orderer_url: Option<String>,
    pub orderer_tls_cafile: Option<PathBuf>,
    pub setup_success_file: PathBuf,
    pub setup_fail_file: PathBuf,
    pub run_success_file: PathBuf,
    pub run_fail_file: PathBuf,
}

impl Default for MiscConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            system_channel_name: DEFAULT_SYSTEM_CHANNEL_NAME.to_string(),
            consortium: DEFAULT_CONSORTIUM.to_string(),
            orderer_url: None,
            orderer_tls_cafile: None,
            setup_success_file: PathBuf::from("logs/setup.successful"),
            setup_fail_file: PathBuf::from("logs/setup.fail"),
            run_success_file: PathBuf::from("logs/run.successful"),
            run_fail_file: PathBuf::from("logs/run.fail"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub orgs: Vec<OrgConfig>,
    #[serde(default)]
    pub misc: MiscConfig,
}

impl NetworkConfig {
    /// Reads and validates the document at `path`. Relative paths are resolved against
    /// `data_root`, or the document's directory when none is given.
    pub fn load(path: &Path, data_root: Option<&Path>) -> Result<Self> {
        debug!("Loading the network configuration from {path:?}");
        let json = std::fs::read_to_string(path)
            .map_err(|err| Error::ConfigRead(path.to_path_buf(), err))?;
        let root = match data_root {
            Some(root) => root.to_path_buf(),
            None => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        Self::from_json(&json, &root)
    }

    pub fn from_json(json: &str, data_root: &Path) -> Result<Self> {
        let mut config: NetworkConfig = serde_json::from_str(json)?;
        config.validate()?;
        config.resolve_paths(data_root);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.orgs.is_empty() {
            return Err(invalid("no organization is described".to_string()));
        }
        let mut names = BTreeSet::new();
        let mut msp_ids = BTreeSet::new();
        for org in &self.orgs {
            if !names.insert(org.name.as_str()) {
                return Err(invalid(format!("organization '{}' is declared twice", org.name)));
            }
            if !msp_ids.insert(org.msp_id.as_str()) {
                return Err(invalid(format!("mspid '{}' is used twice", org.msp_id)));
            }
            org.validate()?;
        }
        let orderer_orgs = self
            .orgs
            .iter()
            .filter(|org| org.kind == OrgKind::Orderer)
            .count();
        if orderer_orgs > 1 {
            return Err(invalid(format!(
                "{orderer_orgs} orderer organizations are declared, at most one is supported"
            )));
        }
        if self.misc.channel_name.is_empty() || self.misc.system_channel_name.is_empty() {
            return Err(invalid("channel names cannot be empty".to_string()));
        }
        Ok(())
    }

    fn resolve_paths(&mut self, root: &Path) {
        for org in &mut self.orgs {
            org.resolve_paths(root);
        }
        let misc = &mut self.misc;
        for path in [
            &mut misc.setup_success_file,
            &mut misc.setup_fail_file,
            &mut misc.run_success_file,
            &mut misc.run_fail_file,
        ] {
            resolve(path, root);
        }
        if let Some(path) = misc.orderer_tls_cafile.as_mut() {
            resolve(path, root);
        }
    }

    pub fn org(&self, name: &str) -> Result<&OrgConfig> {
        self.orgs
            .iter()
            .find(|org| org.name == name)
            .ok_or_else(|| Error::UnknownOrg(name.to_string()))
    }

    /// Peer organizations in declaration order.
    pub fn peer_orgs(&self) -> impl Iterator<Item = &OrgConfig> {
        self.orgs.iter().filter(|org| org.kind == OrgKind::Peer)
    }

    pub fn orderer_org(&self) -> Result<&OrgConfig> {
        self.orgs
            .iter()
            .find(|org| org.kind == OrgKind::Orderer)
            .ok_or(Error::NoOrdererOrg)
    }
}

fn resolve(path: &mut PathBuf, root: &Path) {
    if path.is_relative() {
        *path = root.join(&*path);
    }
}

fn invalid(reason: String) -> Error {
    Error::InvalidConfig(reason)
}
