// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Channel workflows run by organization admins against the ordering service.

use crate::{
    config::OrgKind,
    context::NetworkContext,
    error::{Error, Result},
    VerbosityLevel,
};
use consortium_channel::{
    build_update_proposal, collect_signature,
    consortium_proto::AnchorPeer,
    envelope,
    organization::{
        anchor_peer_fragment, channel_creation_update, insert_application_org,
        insert_consortium_org, merge_anchor_peers,
    },
    Committed, Config, Error as ChannelError, OrdererActions, UpdateProposal, UpdateSession,
};
use consortium_identity::SigningIdentity;
use std::slice;

/// How many times an update is rebuilt after the channel moved under it.
pub const MAX_UPDATE_ATTEMPTS: u32 = 3;

/// Fetches the channel's configuration, builds a proposal from it with `build`, has each of
/// `signers` sign it in order and submits it as the last signer.
///
/// The first signer reads the configuration, so it must already be a member of the channel. A
/// stale update is rebuilt from a fresh fetch up to [`MAX_UPDATE_ATTEMPTS`] times.
pub async fn update_channel<F>(
    orderer: &dyn OrdererActions,
    channel_id: &str,
    signers: &[SigningIdentity],
    build: F,
    verbosity: VerbosityLevel,
) -> Result<Committed>
where
    F: Fn(&Config) -> consortium_channel::Result<UpdateProposal>,
{
    let (Some(reader), Some(submitter)) = (signers.first(), signers.last()) else {
        return Err(Error::NoSigners(channel_id.to_string()));
    };

    for attempt in 1..=MAX_UPDATE_ATTEMPTS {
        let current = orderer.fetch_config(channel_id, reader).await?;
        let mut session = UpdateSession::new(build(&current)?, signers.len());
        for signer in signers {
            session.sign(signer)?;
            debug!("{} signed the update of '{channel_id}'", signer.msp_id());
        }
        if verbosity != VerbosityLevel::Minimal {
            println!(
                "Sending the update of '{channel_id}' signed by {} organization(s)...",
                signers.len()
            );
        }
        match session.submit(orderer, submitter).await {
            Ok(committed) => return Ok(committed),
            Err(ChannelError::StaleConfig(detail)) => {
                warn!(
                    "Attempt {attempt} to update '{channel_id}' went stale: {detail}; \
                     restarting from a fresh configuration"
                );
            }
            Err(err) => return Err(err.into()),
        }
    }
    error!("Giving up on the update of '{channel_id}' after {MAX_UPDATE_ATTEMPTS} attempts");
    Err(Error::StaleRetriesExhausted {
        channel: channel_id.to_string(),
        attempts: MAX_UPDATE_ATTEMPTS,
    })
}

/// The admin of `org_name` creates the channel for `members` of the consortium.
pub async fn create_channel(
    ctx: &NetworkContext,
    orderer: &dyn OrdererActions,
    org_name: &str,
    members: &[&str],
) -> Result<Committed> {
    let org = ctx.org(org_name)?;
    let admin = ctx.admin_identity(org)?;
    let misc = &ctx.config().misc;

    let proposal = UpdateProposal::new(channel_creation_update(
        &misc.channel_name,
        &misc.consortium,
        members,
    ));
    let signature = collect_signature(proposal.update_bytes(), &admin)?;
    let envelope = envelope::seal(
        &misc.channel_name,
        proposal.update_bytes(),
        vec![signature],
        &admin,
    )?;

    ctx.progress(&format!(
        "Creating channel '{}' as {}...",
        misc.channel_name, org.name
    ));
    let committed = orderer.create_channel(envelope).await?;
    ctx.progress(&format!("Channel '{}' created", committed.channel_id));
    Ok(committed)
}

/// Joins every peer of `org_name` to the channel. Peers are known by their endpoint, which is
/// returned for each of them.
pub async fn join_channel(
    ctx: &NetworkContext,
    orderer: &dyn OrdererActions,
    org_name: &str,
) -> Result<Vec<String>> {
    let org = ctx.org(org_name)?;
    if org.kind != OrgKind::Peer {
        return Ok(Vec::new());
    }
    let admin = ctx.admin_identity(org)?;
    let channel = &ctx.config().misc.channel_name;

    let mut joined = Vec::new();
    for peer in &org.nodes {
        let endpoint = peer.endpoint();
        orderer.join_channel(channel, &endpoint, &admin).await?;
        ctx.progress(&format!("{} joined '{channel}'", peer.name));
        joined.push(endpoint);
    }
    Ok(joined)
}

/// Nominates the configured anchor peer of `org_name` on the channel.
pub async fn update_anchor_peers(
    ctx: &NetworkContext,
    orderer: &dyn OrdererActions,
    org_name: &str,
) -> Result<Committed> {
    let org = ctx.org(org_name)?;
    let anchor = org.anchor_peer().ok_or_else(|| {
        Error::InvalidConfig(format!("'{}' has no anchor peer", org.name))
    })?;
    let fragment = anchor_peer_fragment(
        &org.name,
        &[AnchorPeer {
            host: anchor.host.clone(),
            port: u32::from(anchor.port),
        }],
    )?;
    let admin = ctx.admin_identity(org)?;
    let channel = &ctx.config().misc.channel_name;

    ctx.progress(&format!(
        "Updating the anchor peer of {} to {}...",
        org.name,
        anchor.endpoint()
    ));
    update_channel(
        orderer,
        channel,
        slice::from_ref(&admin),
        |current| {
            build_update_proposal(
                channel,
                current,
                fragment.clone(),
                merge_anchor_peers(&org.name),
            )
        },
        ctx.verbosity(),
    )
    .await
}

/// Adds `new_org` to the channel. Every organization of `signer_orgs` signs, in order, and the
/// last one submits.
pub async fn add_org_to_channel(
    ctx: &NetworkContext,
    orderer: &dyn OrdererActions,
    new_org: &str,
    signer_orgs: &[&str],
) -> Result<Committed> {
    let org = ctx.org(new_org)?;
    let group = ctx.org_definition(org, true)?.to_group()?;
    let signers = signer_orgs
        .iter()
        .map(|name| ctx.admin_identity(ctx.org(name)?))
        .collect::<Result<Vec<_>>>()?;
    let channel = &ctx.config().misc.channel_name;

    ctx.progress(&format!("Adding {} to '{channel}'...", org.name));
    update_channel(
        orderer,
        channel,
        &signers,
        |current| {
            build_update_proposal(
                channel,
                current,
                group.clone(),
                insert_application_org(&org.name),
            )
        },
        ctx.verbosity(),
    )
    .await
}

/// Adds `new_org` to the consortium on the system channel, signed by the orderer admin.
pub async fn add_org_to_consortium(
    ctx: &NetworkContext,
    orderer: &dyn OrdererActions,
    new_org: &str,
) -> Result<Committed> {
    let org = ctx.org(new_org)?;
    let group = ctx.org_definition(org, false)?.to_group()?;
    let orderer_admin = ctx.admin_identity(ctx.config().orderer_org()?)?;
    let misc = &ctx.config().misc;

    ctx.progress(&format!(
        "Adding {} to consortium '{}'...",
        org.name, misc.consortium
    ));
    update_channel(
        orderer,
        &misc.system_channel_name,
        slice::from_ref(&orderer_admin),
        |current| {
            build_update_proposal(
                &misc.system_channel_name,
                current,
                group.clone(),
                insert_consortium_org(&misc.consortium, &org.name),
            )
        },
        ctx.verbosity(),
    )
    .await
}

/// The full channel set-up: the first peer organization creates the channel, joins its peers
/// and nominates its anchor peer; every other organization is then added by all current members
/// and joins its peers.
pub async fn run(ctx: &NetworkContext, orderer: &dyn OrdererActions) -> Result<()> {
    let orgs: Vec<&str> = ctx
        .config()
        .peer_orgs()
        .map(|org| org.name.as_str())
        .collect();
    let (&first, others) = orgs.split_first().ok_or(Error::NoPeerOrg)?;

    create_channel(ctx, orderer, first, &[first]).await?;
    join_channel(ctx, orderer, first).await?;
    update_anchor_peers(ctx, orderer, first).await?;

    let mut members = vec![first];
    for &org in others {
        let mut signers = members.clone();
        signers.push(org);
        add_org_to_channel(ctx, orderer, org, &signers).await?;
        join_channel(ctx, orderer, org).await?;
        members.push(org);
    }
    Ok(())
}
