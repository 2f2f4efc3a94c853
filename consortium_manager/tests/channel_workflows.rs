// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

mod common;

use assert_matches::assert_matches;
use color_eyre::{eyre::eyre, Result};
use common::TestNetwork;
use consortium_channel::{
    config::{ANCHOR_PEERS_KEY, APPLICATION_GROUP, CONSORTIUMS_GROUP},
    consortium_proto::AnchorPeers,
    organization::system_channel_config,
    Error as ChannelError, LocalOrderer,
};
use consortium_logging::LogBuilder;
use consortium_manager::{
    channel, context::NetworkContext, error::Error, local::bootstrap_local_orderer, provision,
};

async fn provisioned(orgs: &[&str]) -> Result<(TestNetwork, NetworkContext)> {
    let network = TestNetwork::start(orgs).await?;
    let ctx = network.context()?;
    provision::setup(&ctx, None).await?;
    Ok((network, ctx))
}

#[tokio::test(flavor = "multi_thread")]
async fn run_should_bring_every_peer_org_into_the_channel() -> Result<()> {
    let _log_guard = LogBuilder::init_multi_threaded_tokio_test("channel_workflows")?;
    let (_network, ctx) = provisioned(&["owkin", "chu-nantes"]).await?;
    let orderer = bootstrap_local_orderer(&ctx)?;

    channel::run(&ctx, &orderer).await?;

    let config = orderer
        .channel_config("mychannel")
        .await
        .ok_or_else(|| eyre!("the channel was not created"))?;
    // creation, anchor peer of the creator, second organization
    assert_eq!(config.sequence, 3);
    let root = config.root()?;
    assert!(root.group(&[APPLICATION_GROUP, "chu-nantes"]).is_some());

    let owkin = root
        .group(&[APPLICATION_GROUP, "owkin"])
        .ok_or_else(|| eyre!("owkin is not a member"))?;
    let anchors = owkin
        .decode_value::<AnchorPeers>(ANCHOR_PEERS_KEY)?
        .unwrap_or_default();
    assert_eq!(anchors.anchor_peers.len(), 1);
    assert_eq!(anchors.anchor_peers[0].host, "peer1-owkin");
    assert_eq!(anchors.anchor_peers[0].port, 7051);

    assert_eq!(
        orderer.joined_peers("mychannel").await,
        vec![
            "peer1-chu-nantes:7051",
            "peer1-owkin:7051",
            "peer2-chu-nantes:7051",
            "peer2-owkin:7051",
        ]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unchanged_anchor_peer_should_not_be_submitted_again() -> Result<()> {
    let (_network, ctx) = provisioned(&["owkin"]).await?;
    let orderer = bootstrap_local_orderer(&ctx)?;
    channel::run(&ctx, &orderer).await?;

    assert_matches!(
        channel::update_anchor_peers(&ctx, &orderer, "owkin").await,
        Err(Error::Channel(ChannelError::NoOpUpdate))
    );
    assert_matches!(
        channel::create_channel(&ctx, &orderer, "owkin", &["owkin"]).await,
        Err(Error::Channel(ChannelError::ChannelExists(_)))
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn new_org_should_not_add_itself() -> Result<()> {
    let (_network, ctx) = provisioned(&["owkin", "chu-nantes"]).await?;
    let orderer = bootstrap_local_orderer(&ctx)?;
    channel::create_channel(&ctx, &orderer, "owkin", &["owkin"]).await?;

    assert_matches!(
        channel::add_org_to_channel(&ctx, &orderer, "chu-nantes", &["chu-nantes"]).await,
        Err(Error::Channel(ChannelError::PolicyNotSatisfied(_)))
    );
    let committed =
        channel::add_org_to_channel(&ctx, &orderer, "chu-nantes", &["owkin", "chu-nantes"])
            .await?;
    assert_eq!(committed.sequence, 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn orderer_admin_should_extend_the_consortium() -> Result<()> {
    let (_network, ctx) = provisioned(&["owkin", "chu-nantes"]).await?;
    let config = ctx.config();

    // a consortium made of the first organization only
    let system = system_channel_config(
        &ctx.org_definition(config.orderer_org()?, false)?,
        &ctx.orderer_addresses()?,
        &config.misc.consortium,
        &[ctx.org_definition(config.org("owkin")?, false)?],
    )?;
    let orderer = LocalOrderer::new(config.misc.system_channel_name.clone(), system);
    assert_matches!(
        channel::create_channel(&ctx, &orderer, "owkin", &["owkin", "chu-nantes"]).await,
        Err(Error::Channel(ChannelError::UnknownOrganization(org))) if org == "chu-nantes"
    );

    let committed = channel::add_org_to_consortium(&ctx, &orderer, "chu-nantes").await?;
    assert_eq!(committed.channel_id, "systemchannel");
    let system = orderer
        .channel_config("systemchannel")
        .await
        .ok_or_else(|| eyre!("no system channel"))?;
    assert!(system
        .root()?
        .group(&[CONSORTIUMS_GROUP, "SampleConsortium", "chu-nantes"])
        .is_some());

    channel::create_channel(&ctx, &orderer, "owkin", &["owkin", "chu-nantes"]).await?;
    Ok(())
}
