// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Organization definitions and the configuration fragments built from them.

use crate::{
    config::{
        implicit_meta_policies, ADMINS_POLICY, ANCHOR_PEERS_KEY, APPLICATION_GROUP,
        CHANNEL_CREATION_POLICY, CONSORTIUMS_GROUP, CONSORTIUM_KEY, MSP_KEY, ORDERER_ADDRESSES_KEY,
        ORDERER_GROUP, READERS_POLICY, WRITERS_POLICY,
    },
    consortium_proto::{
        AnchorPeer, AnchorPeers, Config, ConfigGroup, ConfigUpdate, Consortium, ImplicitMetaRule,
        MspConfig, MspRole, OrdererAddresses, Policy,
    },
    error::{Error, Result},
};
use consortium_identity::TrustStore;
use tracing::debug;

/// Modification policy of everything the ordering organization owns.
pub const ORDERER_ADMINS_POLICY: &str = "/Channel/Orderer/Admins";

/// The membership material of one organization as it appears in a channel configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct OrgDefinition {
    name: String,
    msp_id: String,
    root_certs: Vec<String>,
    admin_certs: Vec<String>,
    tls_root_certs: Vec<String>,
    anchor_peers: Vec<AnchorPeer>,
}

impl OrgDefinition {
    pub fn new(name: impl Into<String>, msp_id: impl Into<String>, root_cert_pem: &str) -> Self {
        Self {
            name: name.into(),
            msp_id: msp_id.into(),
            root_certs: vec![root_cert_pem.to_string()],
            admin_certs: Vec::new(),
            tls_root_certs: Vec::new(),
            anchor_peers: Vec::new(),
        }
    }

    /// Reads the CA root, admin certificates and TLS roots of an organization's trust store.
    pub fn from_trust_store(
        name: impl Into<String>,
        msp_id: impl Into<String>,
        trust_store: &TrustStore,
    ) -> Result<Self> {
        let mut definition = Self::new(name, msp_id, &trust_store.cacert_pem()?);
        definition.admin_certs = trust_store.admin_cert_pems()?;
        definition.tls_root_certs = trust_store.tls_cacert_pems()?;
        Ok(definition)
    }

    pub fn with_admin_cert(mut self, cert_pem: &str) -> Self {
        self.admin_certs.push(cert_pem.to_string());
        self
    }

    pub fn with_anchor_peer(mut self, host: &str, port: u16) -> Self {
        self.anchor_peers.push(AnchorPeer {
            host: host.to_string(),
            port: u32::from(port),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn msp_config(&self) -> MspConfig {
        fn bytes(pems: &[String]) -> Vec<Vec<u8>> {
            pems.iter().map(|pem| pem.as_bytes().to_vec()).collect()
        }
        MspConfig {
            name: self.msp_id.clone(),
            root_certs: bytes(&self.root_certs),
            admins: bytes(&self.admin_certs),
            tls_root_certs: bytes(&self.tls_root_certs),
        }
    }

    /// The organization's group: its MSP, optional anchor peer and member/admin policies.
    pub fn to_group(&self) -> Result<ConfigGroup> {
        let mut group = ConfigGroup::with_mod_policy(ADMINS_POLICY);
        group.set_value(MSP_KEY, &self.msp_config(), ADMINS_POLICY);
        if !self.anchor_peers.is_empty() {
            group.set_value(
                ANCHOR_PEERS_KEY,
                &anchor_peers(&self.name, &self.anchor_peers)?,
                ADMINS_POLICY,
            );
        }
        group.set_policy(
            READERS_POLICY,
            Policy::signed_by(&self.msp_id, MspRole::Member),
            ADMINS_POLICY,
        );
        group.set_policy(
            WRITERS_POLICY,
            Policy::signed_by(&self.msp_id, MspRole::Member),
            ADMINS_POLICY,
        );
        group.set_policy(
            ADMINS_POLICY,
            Policy::signed_by(&self.msp_id, MspRole::Admin),
            ADMINS_POLICY,
        );
        Ok(group)
    }
}

/// Only one anchor peer per organization can be nominated.
fn anchor_peers(org: &str, peers: &[AnchorPeer]) -> Result<AnchorPeers> {
    match peers {
        [peer] if !peer.host.is_empty() && peer.port != 0 => Ok(AnchorPeers {
            anchor_peers: vec![peer.clone()],
        }),
        [_] => Err(Error::AnchorPeer(format!(
            "the anchor peer of '{org}' needs a host and a non-zero port"
        ))),
        _ => Err(Error::AnchorPeer(format!(
            "'{org}' nominates {} anchor peers, exactly one is supported",
            peers.len()
        ))),
    }
}

/// A fragment holding only the anchor peer nomination of `org`.
pub fn anchor_peer_fragment(org: &str, peers: &[AnchorPeer]) -> Result<ConfigGroup> {
    let mut fragment = ConfigGroup::with_mod_policy(ADMINS_POLICY);
    fragment.set_value(ANCHOR_PEERS_KEY, &anchor_peers(org, peers)?, ADMINS_POLICY);
    Ok(fragment)
}

/// Merge function inserting an organization group under `Application/<org>`.
pub fn insert_application_org(org: &str) -> impl FnOnce(&mut Config, ConfigGroup) -> Result<()> + '_ {
    move |config, fragment| {
        let application = config
            .root_mut()?
            .group_mut(&[APPLICATION_GROUP])
            .ok_or_else(|| Error::Diff("the channel has no application group".to_string()))?;
        application.groups.insert(org.to_string(), fragment);
        Ok(())
    }
}

/// Merge function inserting an organization group under `Consortiums/<consortium>/<org>`.
pub fn insert_consortium_org<'a>(
    consortium: &'a str,
    org: &'a str,
) -> impl FnOnce(&mut Config, ConfigGroup) -> Result<()> + 'a {
    move |config, fragment| {
        let group = config
            .root_mut()?
            .group_mut(&[CONSORTIUMS_GROUP, consortium])
            .ok_or_else(|| Error::Diff(format!("consortium '{consortium}' is not defined")))?;
        group.groups.insert(org.to_string(), fragment);
        Ok(())
    }
}

/// Merge function copying the anchor peers of a fragment onto `Application/<org>`.
pub fn merge_anchor_peers(org: &str) -> impl FnOnce(&mut Config, ConfigGroup) -> Result<()> + '_ {
    move |config, fragment| {
        let group = config
            .root_mut()?
            .group_mut(&[APPLICATION_GROUP, org])
            .ok_or_else(|| Error::UnknownOrganization(org.to_string()))?;
        let value = fragment
            .values
            .get(ANCHOR_PEERS_KEY)
            .ok_or_else(|| Error::AnchorPeer(format!("no anchor peer given for '{org}'")))?;
        let entry = group.values.entry(ANCHOR_PEERS_KEY.to_string()).or_default();
        entry.value = value.value.clone();
        entry.mod_policy = value.mod_policy.clone();
        Ok(())
    }
}

/// The configuration of the system channel: the ordering organization, its endpoints and one
/// consortium of member organizations.
pub fn system_channel_config(
    orderer_org: &OrgDefinition,
    orderer_addresses: &[String],
    consortium: &str,
    members: &[OrgDefinition],
) -> Result<Config> {
    let mut root = ConfigGroup::with_mod_policy(ADMINS_POLICY);
    implicit_meta_policies(&mut root);
    root.set_value(
        ORDERER_ADDRESSES_KEY,
        &OrdererAddresses {
            addresses: orderer_addresses.to_vec(),
        },
        ORDERER_ADMINS_POLICY,
    );

    let mut orderer = ConfigGroup::with_mod_policy(ADMINS_POLICY);
    implicit_meta_policies(&mut orderer);
    orderer
        .groups
        .insert(orderer_org.name().to_string(), orderer_org.to_group()?);
    root.groups.insert(ORDERER_GROUP.to_string(), orderer);

    let mut consortiums = ConfigGroup::with_mod_policy(ORDERER_ADMINS_POLICY);
    consortiums.set_policy(
        ADMINS_POLICY,
        Policy::signed_by(orderer_org.msp_id(), MspRole::Admin),
        ORDERER_ADMINS_POLICY,
    );
    let mut consortium_group = ConfigGroup::with_mod_policy(ORDERER_ADMINS_POLICY);
    consortium_group.set_policy(
        CHANNEL_CREATION_POLICY,
        Policy::implicit_meta(ADMINS_POLICY, ImplicitMetaRule::Any),
        ORDERER_ADMINS_POLICY,
    );
    for member in members {
        consortium_group
            .groups
            .insert(member.name().to_string(), member.to_group()?);
    }
    consortiums
        .groups
        .insert(consortium.to_string(), consortium_group);
    root.groups.insert(CONSORTIUMS_GROUP.to_string(), consortiums);

    debug!(
        "Built system channel configuration with consortium '{consortium}' of {} member(s)",
        members.len()
    );
    Ok(Config {
        sequence: 0,
        channel_group: Some(root),
    })
}

/// The update creating `channel_id` for some members of `consortium`.
///
/// It reads the members and the consortium name at version zero and writes a bumped application
/// group holding the members and the standard implicit policies.
pub fn channel_creation_update(channel_id: &str, consortium: &str, members: &[&str]) -> ConfigUpdate {
    let consortium_value = |config: &mut ConfigGroup| {
        config.set_value(
            CONSORTIUM_KEY,
            &Consortium {
                name: consortium.to_string(),
            },
            ADMINS_POLICY,
        );
    };

    let mut read_application = ConfigGroup::default();
    for member in members {
        read_application
            .groups
            .insert(member.to_string(), ConfigGroup::default());
    }
    let mut write_application = read_application.clone();
    write_application.version = 1;
    write_application.mod_policy = ADMINS_POLICY.to_string();
    implicit_meta_policies(&mut write_application);

    let mut read_set = ConfigGroup::default();
    consortium_value(&mut read_set);
    read_set
        .groups
        .insert(APPLICATION_GROUP.to_string(), read_application);
    let mut write_set = ConfigGroup::default();
    consortium_value(&mut write_set);
    write_set
        .groups
        .insert(APPLICATION_GROUP.to_string(), write_application);

    ConfigUpdate {
        channel_id: channel_id.to_string(),
        read_set: Some(read_set),
        write_set: Some(write_set),
    }
}

/// The configuration a new channel starts from before its creation update is applied: the
/// ordering section of the system channel and an application group holding every member of the
/// consortium, modifiable under the consortium's channel creation policy.
pub fn channel_template(system: &Config, consortium: &str) -> Result<Config> {
    let root = system.root()?;
    let consortium_group = root
        .group(&[CONSORTIUMS_GROUP, consortium])
        .ok_or_else(|| Error::Rejected(format!("consortium '{consortium}' is not defined")))?;

    let mut template = ConfigGroup::with_mod_policy(ADMINS_POLICY);
    implicit_meta_policies(&mut template);
    if let Some(orderer) = root.groups.get(ORDERER_GROUP) {
        template
            .groups
            .insert(ORDERER_GROUP.to_string(), orderer.clone());
    }
    if let Some(addresses) = root.values.get(ORDERER_ADDRESSES_KEY) {
        template
            .values
            .insert(ORDERER_ADDRESSES_KEY.to_string(), addresses.clone());
    }
    template.set_value(
        CONSORTIUM_KEY,
        &Consortium {
            name: consortium.to_string(),
        },
        ADMINS_POLICY,
    );

    let mut application = ConfigGroup::with_mod_policy(CHANNEL_CREATION_POLICY);
    application.groups = consortium_group.groups.clone();
    application.groups.values_mut().for_each(reset_versions);
    if let Some(creation_policy) = consortium_group.policies.get(CHANNEL_CREATION_POLICY) {
        application
            .policies
            .insert(CHANNEL_CREATION_POLICY.to_string(), creation_policy.clone());
    }
    template
        .groups
        .insert(APPLICATION_GROUP.to_string(), application);

    Ok(Config {
        sequence: 0,
        channel_group: Some(template),
    })
}

/// A new channel starts every member at version zero.
fn reset_versions(group: &mut ConfigGroup) {
    group.version = 0;
    group.values.values_mut().for_each(|value| value.version = 0);
    group.policies.values_mut().for_each(|policy| policy.version = 0);
    group.groups.values_mut().for_each(reset_versions);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::{apply_update, validate_update};
    use assert_matches::assert_matches;

    const ROOT: &str = "-----BEGIN CERTIFICATE-----\nroot\n-----END CERTIFICATE-----\n";

    #[test]
    fn org_group_should_carry_msp_and_standard_policies() -> Result<()> {
        let group = OrgDefinition::new("owkin", "owkinMSP", ROOT)
            .with_admin_cert("admin")
            .with_anchor_peer("peer1-owkin", 7051)
            .to_group()?;

        let msp: Option<MspConfig> = group.decode_value(MSP_KEY)?;
        assert_eq!(msp.map(|m| m.name).as_deref(), Some("owkinMSP"));
        let anchors: Option<AnchorPeers> = group.decode_value(ANCHOR_PEERS_KEY)?;
        assert_eq!(
            anchors.map(|a| a.anchor_peers),
            Some(vec![AnchorPeer {
                host: "peer1-owkin".to_string(),
                port: 7051
            }])
        );
        assert_eq!(
            group.policies.keys().collect::<Vec<_>>(),
            vec![ADMINS_POLICY, READERS_POLICY, WRITERS_POLICY]
        );
        assert_eq!(group.mod_policy, ADMINS_POLICY);
        Ok(())
    }

    #[test]
    fn more_than_one_anchor_peer_should_be_rejected() {
        let definition = OrgDefinition::new("owkin", "owkinMSP", ROOT)
            .with_anchor_peer("peer1-owkin", 7051)
            .with_anchor_peer("peer2-owkin", 7051);
        assert_matches!(definition.to_group(), Err(Error::AnchorPeer(_)));
        assert_matches!(
            anchor_peer_fragment("owkin", &[]),
            Err(Error::AnchorPeer(_))
        );
    }

    #[test]
    fn anchor_peers_of_an_unknown_org_should_not_merge() -> Result<()> {
        let mut config = system_channel_config(
            &OrgDefinition::new("orderer", "ordererMSP", ROOT),
            &[],
            "SampleConsortium",
            &[],
        )?;
        config
            .root_mut()?
            .groups
            .insert(APPLICATION_GROUP.to_string(), ConfigGroup::default());
        let fragment = anchor_peer_fragment(
            "owkin",
            &[AnchorPeer {
                host: "peer1-owkin".to_string(),
                port: 7051,
            }],
        )?;
        assert_matches!(
            merge_anchor_peers("owkin")(&mut config, fragment),
            Err(Error::UnknownOrganization(org)) if org == "owkin"
        );
        Ok(())
    }

    #[test]
    fn creation_update_should_apply_to_the_channel_template() -> Result<()> {
        let members = [
            OrgDefinition::new("owkin", "owkinMSP", ROOT),
            OrgDefinition::new("chu-nantes", "chu-nantesMSP", ROOT),
        ];
        let system = system_channel_config(
            &OrgDefinition::new("orderer", "ordererMSP", ROOT),
            &["orderer1-orderer:7050".to_string()],
            "SampleConsortium",
            &members,
        )?;

        let template = channel_template(&system, "SampleConsortium")?;
        let update = channel_creation_update("mychannel", "SampleConsortium", &["owkin"]);
        let deltas = validate_update(&template, &update)?;
        assert_eq!(deltas.len(), 1);
        assert_eq!(
            deltas[0].policy.path(),
            "/Channel/Application/ChannelCreationPolicy"
        );

        let channel = apply_update(&template, &update)?;
        let application = channel.root()?.group(&[APPLICATION_GROUP]);
        assert_eq!(
            application.map(|a| a.groups.keys().cloned().collect::<Vec<_>>()),
            Some(vec!["owkin".to_string()])
        );
        assert_eq!(application.map(|a| a.mod_policy.as_str()), Some(ADMINS_POLICY));
        assert!(channel.root()?.group(&[ORDERER_GROUP, "orderer"]).is_some());
        assert_eq!(channel.sequence, 1);
        Ok(())
    }
}
