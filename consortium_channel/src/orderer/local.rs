// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! An ordering service kept in memory, for local networks and tests.

use super::{Committed, OrdererActions};
use crate::{
    apply::{apply_update, authorize, validate_update},
    config::{APPLICATION_GROUP, CHANNEL_GROUP, CONSORTIUM_KEY, READERS_POLICY},
    consortium_proto::{Config, Consortium, Envelope},
    envelope::{self, OpenedUpdate},
    error::{Error, Result},
    organization::channel_template,
    policy::{PolicyEvaluator, PolicyRef},
    signature::{verify_envelope, Signer},
};
use async_trait::async_trait;
use consortium_identity::SigningIdentity;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Ledger {
    channels: BTreeMap<String, Config>,
    peers: BTreeMap<String, BTreeSet<String>>,
}

/// Holds every channel's configuration and enforces the modification policies on updates.
#[derive(Debug)]
pub struct LocalOrderer {
    system_channel_id: String,
    ledger: RwLock<Ledger>,
}

impl LocalOrderer {
    /// Starts from the system channel's configuration.
    pub fn new(system_channel_id: impl Into<String>, system_config: Config) -> Self {
        let system_channel_id = system_channel_id.into();
        let mut ledger = Ledger::default();
        ledger
            .channels
            .insert(system_channel_id.clone(), system_config);
        Self {
            system_channel_id,
            ledger: RwLock::new(ledger),
        }
    }

    pub fn system_channel_id(&self) -> &str {
        &self.system_channel_id
    }

    /// The configuration without any access check.
    pub async fn channel_config(&self, channel_id: &str) -> Option<Config> {
        self.ledger.read().await.channels.get(channel_id).cloned()
    }

    pub async fn joined_peers(&self, channel_id: &str) -> Vec<String> {
        self.ledger
            .read()
            .await
            .peers
            .get(channel_id)
            .map(|peers| peers.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn require_reader(config: &Config, requester: &SigningIdentity) -> Result<()> {
        let readers = PolicyRef {
            group_path: vec![CHANNEL_GROUP.to_string()],
            name: READERS_POLICY.to_string(),
        };
        let signer = Signer {
            msp_id: requester.msp_id().to_string(),
            cert_pem: requester.cert_pem().to_string(),
        };
        PolicyEvaluator::new(config.root()?)?.require(&readers, &[signer])
    }

    /// Validates and authorizes `opened` against `base`, returning the resulting configuration.
    fn commit(base: &Config, opened: &OpenedUpdate) -> Result<Config> {
        let deltas = validate_update(base, &opened.update)?;
        let signers = verify_envelope(&opened.update_envelope)?;
        authorize(base, &deltas, &signers)?;
        apply_update(base, &opened.update)
    }
}

#[async_trait]
impl OrdererActions for LocalOrderer {
    async fn fetch_config(&self, channel_id: &str, requester: &SigningIdentity) -> Result<Config> {
        let ledger = self.ledger.read().await;
        let config = ledger
            .channels
            .get(channel_id)
            .ok_or_else(|| Error::ChannelNotFound(channel_id.to_string()))?;
        Self::require_reader(config, requester)?;
        debug!(
            "Serving configuration of '{channel_id}' at sequence {}",
            config.sequence
        );
        Ok(config.clone())
    }

    async fn broadcast_config_update(&self, envelope: Envelope) -> Result<Committed> {
        let opened = envelope::open(&envelope)?;
        let mut ledger = self.ledger.write().await;
        let current = ledger
            .channels
            .get(&opened.channel_id)
            .ok_or_else(|| Error::ChannelNotFound(opened.channel_id.clone()))?;

        let updated = Self::commit(current, &opened).map_err(|err| {
            warn!("Rejected update of '{}': {err}", opened.channel_id);
            err
        })?;
        let sequence = updated.sequence;
        ledger.channels.insert(opened.channel_id.clone(), updated);
        info!(
            "Committed update of '{}' at sequence {sequence}",
            opened.channel_id
        );
        Ok(Committed {
            channel_id: opened.channel_id,
            sequence,
        })
    }

    async fn create_channel(&self, envelope: Envelope) -> Result<Committed> {
        let opened = envelope::open(&envelope)?;
        let mut ledger = self.ledger.write().await;
        if ledger.channels.contains_key(&opened.channel_id) {
            return Err(Error::ChannelExists(opened.channel_id));
        }

        let write = opened.update.write_set.clone().unwrap_or_default();
        let consortium = write
            .decode_value::<Consortium>(CONSORTIUM_KEY)?
            .ok_or_else(|| {
                Error::Rejected("a channel creation update must name its consortium".to_string())
            })?;
        let system = ledger
            .channels
            .get(&self.system_channel_id)
            .ok_or_else(|| Error::ChannelNotFound(self.system_channel_id.clone()))?;
        let template = channel_template(system, &consortium.name)?;

        let known = template.root()?.group(&[APPLICATION_GROUP]);
        let requested = opened
            .update
            .read_set
            .as_ref()
            .and_then(|read| read.group(&[APPLICATION_GROUP]));
        if let (Some(known), Some(requested)) = (known, requested) {
            if let Some(unknown) = requested
                .groups
                .keys()
                .find(|org| !known.groups.contains_key(*org))
            {
                return Err(Error::UnknownOrganization(unknown.clone()));
            }
        }

        let created = Self::commit(&template, &opened)?;
        let sequence = created.sequence;
        ledger.channels.insert(opened.channel_id.clone(), created);
        info!(
            "Created channel '{}' for consortium '{}'",
            opened.channel_id, consortium.name
        );
        Ok(Committed {
            channel_id: opened.channel_id,
            sequence,
        })
    }

    async fn join_channel(
        &self,
        channel_id: &str,
        peer: &str,
        requester: &SigningIdentity,
    ) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        let config = ledger
            .channels
            .get(channel_id)
            .ok_or_else(|| Error::ChannelNotFound(channel_id.to_string()))?;
        Self::require_reader(config, requester)?;
        if !ledger
            .peers
            .entry(channel_id.to_string())
            .or_default()
            .insert(peer.to_string())
        {
            debug!("Peer '{peer}' already joined '{channel_id}'");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        organization::{channel_creation_update, system_channel_config, OrgDefinition},
        signature::collect_signature,
    };
    use assert_matches::assert_matches;
    use color_eyre::eyre::Result;
    use consortium_identity::test_utils::TestOrg;
    use prost::Message;

    struct Network {
        orderer: LocalOrderer,
        org: TestOrg,
        admin: SigningIdentity,
        orderer_org: TestOrg,
        orderer_admin: SigningIdentity,
    }

    fn network() -> Result<Network> {
        let orderer_org = TestOrg::new("orderer", "ordererMSP")?;
        let orderer_admin = orderer_org.issue("admin-orderer")?;
        let org = TestOrg::new("owkin", "owkinMSP")?;
        let admin = org.issue("admin-owkin")?;

        let system = system_channel_config(
            &OrgDefinition::new("orderer", "ordererMSP", orderer_org.ca_cert_pem())
                .with_admin_cert(orderer_admin.cert_pem()),
            &["orderer1-orderer:7050".to_string()],
            "SampleConsortium",
            &[OrgDefinition::new("owkin", "owkinMSP", org.ca_cert_pem())
                .with_admin_cert(admin.cert_pem())],
        )?;
        Ok(Network {
            orderer: LocalOrderer::new("systemchannel", system),
            org,
            admin,
            orderer_org,
            orderer_admin,
        })
    }

    fn creation_envelope(members: &[&str], signer: &SigningIdentity) -> Result<Envelope> {
        let bytes = channel_creation_update("mychannel", "SampleConsortium", members).encode_to_vec();
        let signature = collect_signature(&bytes, signer)?;
        Ok(envelope::seal("mychannel", &bytes, vec![signature], signer)?)
    }

    #[tokio::test]
    async fn member_admin_should_create_and_join_a_channel() -> Result<()> {
        let net = network()?;
        let committed = net
            .orderer
            .create_channel(creation_envelope(&["owkin"], &net.admin)?)
            .await?;
        assert_eq!(committed.sequence, 1);

        let peer = net.org.issue("peer1-owkin")?;
        let config = net.orderer.fetch_config("mychannel", &peer).await?;
        assert!(config.root()?.group(&[APPLICATION_GROUP, "owkin"]).is_some());

        net.orderer.join_channel("mychannel", "peer1-owkin", &peer).await?;
        net.orderer.join_channel("mychannel", "peer1-owkin", &peer).await?;
        assert_eq!(net.orderer.joined_peers("mychannel").await, vec!["peer1-owkin"]);

        assert_matches!(
            net.orderer
                .create_channel(creation_envelope(&["owkin"], &net.admin)?)
                .await,
            Err(Error::ChannelExists(channel)) if channel == "mychannel"
        );
        Ok(())
    }

    #[tokio::test]
    async fn creation_for_a_non_member_should_be_refused() -> Result<()> {
        let net = network()?;
        assert_matches!(
            net.orderer
                .create_channel(creation_envelope(&["chu-nantes"], &net.admin)?)
                .await,
            Err(Error::UnknownOrganization(org)) if org == "chu-nantes"
        );

        // an orderer admin is not an admin of any consortium member
        assert_matches!(
            net.orderer
                .create_channel(creation_envelope(&["owkin"], &net.orderer_admin)?)
                .await,
            Err(Error::PolicyNotSatisfied(_))
        );
        Ok(())
    }

    #[tokio::test]
    async fn outsiders_should_not_read_the_configuration() -> Result<()> {
        let net = network()?;
        let outsider = TestOrg::new("elsewhere", "owkinMSP")?.issue("peer1-elsewhere")?;
        assert_matches!(
            net.orderer.fetch_config("systemchannel", &outsider).await,
            Err(Error::PolicyNotSatisfied(_))
        );
        let orderer_peer = net.orderer_org.issue("orderer1-orderer")?;
        net.orderer.fetch_config("systemchannel", &orderer_peer).await?;
        assert_matches!(
            net.orderer.fetch_config("nochannel", &orderer_peer).await,
            Err(Error::ChannelNotFound(_))
        );
        Ok(())
    }
}
