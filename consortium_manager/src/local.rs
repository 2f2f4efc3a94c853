// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{context::NetworkContext, error::Result};
use consortium_channel::{organization::system_channel_config, LocalOrderer};

/// Starts an in-memory ordering service whose system channel holds the ordering organization,
/// its node endpoints and a consortium of every peer organization.
///
/// Every organization must have been set up first: the definitions are read from the admins'
/// trust stores.
pub fn bootstrap_local_orderer(ctx: &NetworkContext) -> Result<LocalOrderer> {
    let config = ctx.config();
    let orderer_def = ctx.org_definition(config.orderer_org()?, false)?;
    let members = config
        .peer_orgs()
        .map(|org| ctx.org_definition(org, false))
        .collect::<Result<Vec<_>>>()?;

    let system = system_channel_config(
        &orderer_def,
        &ctx.orderer_addresses()?,
        &config.misc.consortium,
        &members,
    )?;
    info!(
        "Started a local ordering service for '{}' with {} consortium member(s)",
        config.misc.system_channel_name,
        members.len()
    );
    Ok(LocalOrderer::new(
        config.misc.system_channel_name.clone(),
        system,
    ))
}
