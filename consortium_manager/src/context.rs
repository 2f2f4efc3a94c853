// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{
    config::{NetworkConfig, NodeConfig, OrgConfig},
    error::Result,
    VerbosityLevel,
};
use consortium_channel::{HttpOrderer, OrdererActions, OrgDefinition};
use consortium_identity::{liveness, CaClient, SigningIdentity, TrustStore};

/// Everything a workflow needs to know about the network, passed explicitly to each step.
#[derive(Clone, Debug)]
pub struct NetworkContext {
    config: NetworkConfig,
    verbosity: VerbosityLevel,
}

impl NetworkContext {
    pub fn new(config: NetworkConfig, verbosity: VerbosityLevel) -> Self {
        Self { config, verbosity }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn org(&self, name: &str) -> Result<&OrgConfig> {
        self.config.org(name)
    }

    /// Prints a progress line unless the output is minimal.
    pub fn progress(&self, message: &str) {
        info!("{message}");
        if self.verbosity != VerbosityLevel::Minimal {
            println!("{message}");
        }
    }

    /// A client of the organization's CA. Over TLS the CA's root certificate file is awaited and
    /// trusted.
    pub async fn ca_client(&self, org: &OrgConfig) -> Result<CaClient> {
        let tls_root = if org.ca.uses_tls() {
            liveness::wait_for_file(&org.ca.certfile, org.ca.wait()).await?;
            Some(std::fs::read_to_string(&org.ca.certfile)?)
        } else {
            None
        };
        Ok(CaClient::new(
            &org.ca.url(),
            org.ca.name.clone(),
            tls_root.as_deref(),
        )?)
    }

    /// The trust store holding the organization admin's enrollment.
    pub fn admin_trust_store(&self, org: &OrgConfig) -> TrustStore {
        TrustStore::new(org.admin_msp_dir())
    }

    pub fn admin_identity(&self, org: &OrgConfig) -> Result<SigningIdentity> {
        Ok(self
            .admin_trust_store(org)
            .signing_identity(&org.msp_id)?)
    }

    /// The organization as channel members see it, read from its admin's trust store. The anchor
    /// peer is included when `with_anchor` is set.
    pub fn org_definition(&self, org: &OrgConfig, with_anchor: bool) -> Result<OrgDefinition> {
        let mut definition =
            OrgDefinition::from_trust_store(&org.name, &org.msp_id, &self.admin_trust_store(org))?;
        if with_anchor {
            if let Some(anchor) = org.anchor_peer() {
                definition = definition.with_anchor_peer(&anchor.host, anchor.port);
            }
        }
        Ok(definition)
    }

    /// The endpoints of every orderer node.
    pub fn orderer_addresses(&self) -> Result<Vec<String>> {
        Ok(self
            .config
            .orderer_org()?
            .nodes
            .iter()
            .map(NodeConfig::endpoint)
            .collect())
    }

    /// The ordering gateway, when the configuration names one.
    pub fn remote_orderer(&self) -> Result<Option<Box<dyn OrdererActions>>> {
        let Some(url) = self.config.misc.orderer_url.as_deref() else {
            return Ok(None);
        };
        let tls_root = match &self.config.misc.orderer_tls_cafile {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => None,
        };
        debug!("Using the ordering gateway at {url}");
        Ok(Some(Box::new(HttpOrderer::new(url, tls_root.as_deref())?)))
    }
}
