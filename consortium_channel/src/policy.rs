// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Evaluation of modification policies against a set of verified signers.

use crate::{
    config::CHANNEL_GROUP,
    consortium_proto::{
        policy, ConfigGroup, ImplicitMetaPolicy, ImplicitMetaRule, MspConfig, MspPrincipal,
        MspRole, SignaturePolicy,
    },
    error::{Error, Result},
    signature::Signer,
};
use consortium_identity::certificate;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Fully qualified reference to a policy: the group holding it and its name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyRef {
    /// Group names from the root, the first one being the channel group.
    pub group_path: Vec<String>,
    pub name: String,
}

impl PolicyRef {
    /// Resolves a modification policy name as seen from the group at `scope`.
    ///
    /// Names starting with `/` are absolute (`/Channel/Orderer/Admins`), other names are relative
    /// to `scope`.
    pub fn resolve(scope: &[String], mod_policy: &str) -> Self {
        let (mut group_path, relative) = match mod_policy.strip_prefix('/') {
            Some(absolute) => (Vec::new(), absolute),
            None => (scope.to_vec(), mod_policy),
        };
        let mut segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        let name = segments.pop().unwrap_or_default().to_string();
        group_path.extend(segments.into_iter().map(str::to_string));
        Self { group_path, name }
    }

    pub fn path(&self) -> String {
        format!("/{}/{}", self.group_path.join("/"), self.name)
    }
}

/// Evaluates policies of one configuration tree.
pub struct PolicyEvaluator<'a> {
    root: &'a ConfigGroup,
    msps: BTreeMap<String, MspConfig>,
}

impl<'a> PolicyEvaluator<'a> {
    pub fn new(root: &'a ConfigGroup) -> Result<Self> {
        Ok(Self {
            root,
            msps: root.msp_configs()?,
        })
    }

    /// Whether `signers` satisfy the referenced policy.
    pub fn evaluate(&self, policy: &PolicyRef, signers: &[Signer]) -> Result<bool> {
        let group = match policy.group_path.split_first() {
            Some((first, rest)) if first == CHANNEL_GROUP => {
                let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
                self.root.group(&rest)
            }
            _ => None,
        };
        let Some(group) = group else {
            return Err(Error::PolicyNotSatisfied(format!(
                "{} (no such group)",
                policy.path()
            )));
        };
        let satisfied = self.evaluate_in(group, &policy.name, signers)?;
        debug!("Policy {} satisfied: {satisfied}", policy.path());
        Ok(satisfied)
    }

    /// Fails with `PolicyNotSatisfied` unless the referenced policy is satisfied.
    pub fn require(&self, policy: &PolicyRef, signers: &[Signer]) -> Result<()> {
        if self.evaluate(policy, signers)? {
            Ok(())
        } else {
            Err(Error::PolicyNotSatisfied(policy.path()))
        }
    }

    fn evaluate_in(&self, group: &ConfigGroup, name: &str, signers: &[Signer]) -> Result<bool> {
        let kind = group
            .policies
            .get(name)
            .and_then(|p| p.policy.as_ref())
            .and_then(|p| p.kind.as_ref());
        match kind {
            None => Ok(false),
            Some(policy::Kind::ImplicitMeta(meta)) => self.implicit_meta(group, meta, signers),
            Some(policy::Kind::Signature(signature)) => Ok(self.signature(signature, signers)),
        }
    }

    fn implicit_meta(
        &self,
        group: &ConfigGroup,
        meta: &ImplicitMetaPolicy,
        signers: &[Signer],
    ) -> Result<bool> {
        let children = group.groups.len();
        // a policy over no child group cannot be satisfied
        if children == 0 {
            return Ok(false);
        }
        let threshold = match ImplicitMetaRule::from_i32(meta.rule) {
            Some(ImplicitMetaRule::Any) => 1,
            Some(ImplicitMetaRule::All) => children,
            Some(ImplicitMetaRule::Majority) | None => children / 2 + 1,
        };
        let mut satisfied = 0;
        for child in group.groups.values() {
            if self.evaluate_in(child, &meta.sub_policy, signers)? {
                satisfied += 1;
                if satisfied >= threshold {
                    return Ok(true);
                }
            }
        }
        trace!(
            "{satisfied} of {children} child '{}' policies satisfied, {threshold} required",
            meta.sub_policy
        );
        Ok(false)
    }

    /// Each principal consumes a distinct signer, in principal order.
    fn signature(&self, policy: &SignaturePolicy, signers: &[Signer]) -> bool {
        let mut used = vec![false; signers.len()];
        let mut satisfied = 0u32;
        for principal in &policy.principals {
            let matching = signers
                .iter()
                .enumerate()
                .find(|(index, signer)| !used[*index] && self.satisfies(signer, principal));
            if let Some((index, _)) = matching {
                used[index] = true;
                satisfied += 1;
            }
        }
        satisfied >= policy.n
    }

    fn satisfies(&self, signer: &Signer, principal: &MspPrincipal) -> bool {
        if signer.msp_id != principal.msp_id {
            return false;
        }
        let Some(msp) = self.msps.get(&principal.msp_id) else {
            return false;
        };
        match MspRole::from_i32(principal.role) {
            Some(MspRole::Member) => msp.root_certs.iter().any(|root| {
                std::str::from_utf8(root)
                    .map(|root| certificate::is_issued_by(&signer.cert_pem, root).unwrap_or(false))
                    .unwrap_or(false)
            }),
            Some(MspRole::Admin) => msp.admins.iter().any(|admin| {
                std::str::from_utf8(admin)
                    .map(|admin| certificate::same_certificate(admin, &signer.cert_pem))
                    .unwrap_or(false)
            }),
            None => false,
        }
    }
}
