// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

pub mod http;
pub mod local;

use crate::{
    consortium_proto::{Config, Envelope},
    error::Result,
};
use async_trait::async_trait;
use consortium_identity::SigningIdentity;

/// Acknowledgement of a committed configuration change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Committed {
    pub channel_id: String,
    pub sequence: u64,
}

/// The operations an ordering service offers to the channel workflows.
#[async_trait]
pub trait OrdererActions: Send + Sync {
    /// The current configuration of `channel_id`, readable by members of the channel.
    async fn fetch_config(&self, channel_id: &str, requester: &SigningIdentity) -> Result<Config>;
    /// Validates, authorizes and commits a signed config update envelope.
    async fn broadcast_config_update(&self, envelope: Envelope) -> Result<Committed>;
    /// Instantiates a new channel from a signed channel creation update.
    async fn create_channel(&self, envelope: Envelope) -> Result<Committed>;
    async fn join_channel(
        &self,
        channel_id: &str,
        peer: &str,
        requester: &SigningIdentity,
    ) -> Result<()>;
}
