// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Navigation and construction helpers over the configuration tree.

use crate::{
    consortium_proto::{
        policy, Config, ConfigGroup, ConfigPolicy, ConfigValue, ImplicitMetaPolicy,
        ImplicitMetaRule, MspConfig, MspPrincipal, MspRole, Policy, SignaturePolicy,
    },
    error::{Error, Result},
};
use prost::Message;
use std::collections::BTreeMap;

pub const CHANNEL_GROUP: &str = "Channel";
pub const APPLICATION_GROUP: &str = "Application";
pub const ORDERER_GROUP: &str = "Orderer";
pub const CONSORTIUMS_GROUP: &str = "Consortiums";

pub const MSP_KEY: &str = "MSP";
pub const ANCHOR_PEERS_KEY: &str = "AnchorPeers";
pub const ORDERER_ADDRESSES_KEY: &str = "OrdererAddresses";
pub const CONSORTIUM_KEY: &str = "Consortium";

pub const READERS_POLICY: &str = "Readers";
pub const WRITERS_POLICY: &str = "Writers";
pub const ADMINS_POLICY: &str = "Admins";
pub const CHANNEL_CREATION_POLICY: &str = "ChannelCreationPolicy";

impl Config {
    pub fn root(&self) -> Result<&ConfigGroup> {
        self.channel_group
            .as_ref()
            .ok_or_else(|| Error::Diff("configuration has no channel group".to_string()))
    }

    pub fn root_mut(&mut self) -> Result<&mut ConfigGroup> {
        self.channel_group
            .as_mut()
            .ok_or_else(|| Error::Diff("configuration has no channel group".to_string()))
    }
}

impl ConfigGroup {
    pub fn with_mod_policy(mod_policy: &str) -> Self {
        Self {
            mod_policy: mod_policy.to_string(),
            ..Default::default()
        }
    }

    pub fn group(&self, path: &[&str]) -> Option<&ConfigGroup> {
        path.iter()
            .try_fold(self, |group, name| group.groups.get(*name))
    }

    pub fn group_mut(&mut self, path: &[&str]) -> Option<&mut ConfigGroup> {
        path.iter()
            .try_fold(self, |group, name| group.groups.get_mut(*name))
    }

    /// Decodes the value stored under `key`, if any.
    pub fn decode_value<M: Message + Default>(&self, key: &str) -> Result<Option<M>> {
        self.values
            .get(key)
            .map(|value| M::decode(value.value.as_slice()))
            .transpose()
            .map_err(Error::from)
    }

    /// Sets a value, keeping the stored version: versions are only assigned by the diff.
    pub fn set_value<M: Message>(&mut self, key: &str, message: &M, mod_policy: &str) {
        let entry = self.values.entry(key.to_string()).or_default();
        entry.value = message.encode_to_vec();
        entry.mod_policy = mod_policy.to_string();
    }

    pub fn set_policy(&mut self, key: &str, policy: Policy, mod_policy: &str) {
        let entry = self.policies.entry(key.to_string()).or_default();
        entry.policy = Some(policy);
        entry.mod_policy = mod_policy.to_string();
    }

    /// All MSP definitions found in this group and below, keyed by MSP id.
    pub fn msp_configs(&self) -> Result<BTreeMap<String, MspConfig>> {
        let mut found = BTreeMap::new();
        self.collect_msps(&mut found)?;
        Ok(found)
    }

    fn collect_msps(&self, found: &mut BTreeMap<String, MspConfig>) -> Result<()> {
        if let Some(msp) = self.decode_value::<MspConfig>(MSP_KEY)? {
            found.insert(msp.name.clone(), msp);
        }
        for group in self.groups.values() {
            group.collect_msps(found)?;
        }
        Ok(())
    }

    /// Structural equality ignoring every version number.
    pub fn same_content(&self, other: &ConfigGroup) -> bool {
        fn same_keys<V>(
            a: &BTreeMap<String, V>,
            b: &BTreeMap<String, V>,
            eq: impl Fn(&V, &V) -> bool,
        ) -> bool {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && eq(va, vb))
        }

        self.mod_policy == other.mod_policy
            && same_keys(&self.groups, &other.groups, |a, b| a.same_content(b))
            && same_keys(&self.values, &other.values, |a, b| {
                a.value == b.value && a.mod_policy == b.mod_policy
            })
            && same_keys(&self.policies, &other.policies, |a, b| {
                a.policy == b.policy && a.mod_policy == b.mod_policy
            })
    }
}

impl ConfigValue {
    pub fn new<M: Message>(message: &M, mod_policy: &str) -> Self {
        Self {
            version: 0,
            value: message.encode_to_vec(),
            mod_policy: mod_policy.to_string(),
        }
    }
}

impl ConfigPolicy {
    pub fn new(policy: Policy, mod_policy: &str) -> Self {
        Self {
            version: 0,
            policy: Some(policy),
            mod_policy: mod_policy.to_string(),
        }
    }
}

impl Policy {
    /// A policy over the `sub_policy` of every child group.
    pub fn implicit_meta(sub_policy: &str, rule: ImplicitMetaRule) -> Self {
        Self {
            kind: Some(policy::Kind::ImplicitMeta(ImplicitMetaPolicy {
                sub_policy: sub_policy.to_string(),
                rule: rule as i32,
            })),
        }
    }

    /// At least `n` of the principals must sign.
    pub fn n_out_of(n: u32, principals: Vec<(String, MspRole)>) -> Self {
        Self {
            kind: Some(policy::Kind::Signature(SignaturePolicy {
                n,
                principals: principals
                    .into_iter()
                    .map(|(msp_id, role)| MspPrincipal {
                        msp_id,
                        role: role as i32,
                    })
                    .collect(),
            })),
        }
    }

    pub fn signed_by(msp_id: &str, role: MspRole) -> Self {
        Self::n_out_of(1, vec![(msp_id.to_string(), role)])
    }
}

/// `Readers`, `Writers` (ANY) and `Admins` (MAJORITY) over the child groups.
pub fn implicit_meta_policies(group: &mut ConfigGroup) {
    group.set_policy(
        READERS_POLICY,
        Policy::implicit_meta(READERS_POLICY, ImplicitMetaRule::Any),
        ADMINS_POLICY,
    );
    group.set_policy(
        WRITERS_POLICY,
        Policy::implicit_meta(WRITERS_POLICY, ImplicitMetaRule::Any),
        ADMINS_POLICY,
    );
    group.set_policy(
        ADMINS_POLICY,
        Policy::implicit_meta(ADMINS_POLICY, ImplicitMetaRule::Majority),
        ADMINS_POLICY,
    );
}
