// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{
    consortium_proto::{Config, ConfigGroup, ConfigUpdate},
    diff::compute_update,
    error::Result,
};
use prost::Message;
use tracing::info;

/// A computed update ready to be signed: every party signs the same serialized bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateProposal {
    channel_id: String,
    update: ConfigUpdate,
    update_bytes: Vec<u8>,
}

impl UpdateProposal {
    pub fn new(update: ConfigUpdate) -> Self {
        Self {
            channel_id: update.channel_id.clone(),
            update_bytes: update.encode_to_vec(),
            update,
        }
    }

    /// Restores a proposal from the bytes other parties signed.
    pub fn from_bytes(update_bytes: Vec<u8>) -> Result<Self> {
        let update = ConfigUpdate::decode(update_bytes.as_slice())?;
        Ok(Self {
            channel_id: update.channel_id.clone(),
            update,
            update_bytes,
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn update(&self) -> &ConfigUpdate {
        &self.update
    }

    pub fn update_bytes(&self) -> &[u8] {
        &self.update_bytes
    }
}

/// Merges `fragment` into a copy of `current` with `merge` and diffs the result against
/// `current`.
///
/// Fails with `NoOpUpdate` before anything leaves the process when the merge changes nothing.
pub fn build_update_proposal<F>(
    channel_id: &str,
    current: &Config,
    fragment: ConfigGroup,
    merge: F,
) -> Result<UpdateProposal>
where
    F: FnOnce(&mut Config, ConfigGroup) -> Result<()>,
{
    let mut merged = current.clone();
    merge(&mut merged, fragment)?;
    let update = compute_update(channel_id, current, &merged)?;
    info!(
        "Built update proposal for channel '{channel_id}' at sequence {}",
        current.sequence
    );
    Ok(UpdateProposal::new(update))
}
