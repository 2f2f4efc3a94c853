// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use super::{connect_orderer, finish, load_context};
use crate::{
    channel, context::NetworkContext, error::Result as WorkflowResult,
    local::bootstrap_local_orderer, print_banner, VerbosityLevel,
};
use color_eyre::Result;
use consortium_channel::Committed;
use std::path::{Path, PathBuf};

fn prepare(
    config_path: &Path,
    data_root: Option<&Path>,
    banner: &str,
    verbosity: VerbosityLevel,
) -> Result<NetworkContext> {
    if verbosity != VerbosityLevel::Minimal {
        print_banner(banner);
    }
    load_context(config_path, data_root, verbosity)
}

fn record(ctx: &NetworkContext, result: WorkflowResult<()>, what: &str) -> Result<()> {
    let misc = &ctx.config().misc;
    finish(
        result,
        &misc.run_success_file,
        &misc.run_fail_file,
        what,
        ctx.verbosity(),
    )
}

fn committed(result: WorkflowResult<Committed>) -> WorkflowResult<()> {
    result.map(|committed| {
        debug!(
            "'{}' is at sequence {}",
            committed.channel_id, committed.sequence
        );
    })
}

pub async fn create(
    config_path: PathBuf,
    data_root: Option<PathBuf>,
    org: String,
    members: Vec<String>,
    verbosity: VerbosityLevel,
) -> Result<()> {
    let ctx = prepare(
        &config_path,
        data_root.as_deref(),
        "Create Channel",
        verbosity,
    )?;
    let mut members: Vec<&str> = members.iter().map(String::as_str).collect();
    if members.is_empty() {
        members.push(&org);
    }
    let result = match connect_orderer(&ctx) {
        Ok(orderer) => {
            committed(channel::create_channel(&ctx, orderer.as_ref(), &org, &members).await)
        }
        Err(err) => Err(err),
    };
    record(
        &ctx,
        result,
        &format!("Creating '{}'", ctx.config().misc.channel_name),
    )
}

pub async fn join(
    config_path: PathBuf,
    data_root: Option<PathBuf>,
    org: String,
    verbosity: VerbosityLevel,
) -> Result<()> {
    let ctx = prepare(
        &config_path,
        data_root.as_deref(),
        "Join Channel",
        verbosity,
    )?;
    let result = match connect_orderer(&ctx) {
        Ok(orderer) => channel::join_channel(&ctx, orderer.as_ref(), &org)
            .await
            .map(|peers| debug!("Joined {peers:?}")),
        Err(err) => Err(err),
    };
    record(&ctx, result, &format!("Joining the peers of {org}"))
}

pub async fn anchor_peers(
    config_path: PathBuf,
    data_root: Option<PathBuf>,
    org: String,
    verbosity: VerbosityLevel,
) -> Result<()> {
    let ctx = prepare(
        &config_path,
        data_root.as_deref(),
        "Update Anchor Peers",
        verbosity,
    )?;
    let result = match connect_orderer(&ctx) {
        Ok(orderer) => {
            committed(channel::update_anchor_peers(&ctx, orderer.as_ref(), &org).await)
        }
        Err(err) => Err(err),
    };
    record(&ctx, result, &format!("Updating the anchor peer of {org}"))
}

/// Adds `org` to the channel. `signers` sign in order; without any, `org` signs alone.
pub async fn add_org(
    config_path: PathBuf,
    data_root: Option<PathBuf>,
    org: String,
    signers: Vec<String>,
    verbosity: VerbosityLevel,
) -> Result<()> {
    let ctx = prepare(
        &config_path,
        data_root.as_deref(),
        "Add Organization",
        verbosity,
    )?;
    let mut signers: Vec<&str> = signers.iter().map(String::as_str).collect();
    if signers.is_empty() {
        signers.push(&org);
    }
    let result = match connect_orderer(&ctx) {
        Ok(orderer) => {
            committed(channel::add_org_to_channel(&ctx, orderer.as_ref(), &org, &signers).await)
        }
        Err(err) => Err(err),
    };
    record(&ctx, result, &format!("Adding {org} to the channel"))
}

/// The whole channel set-up. Without an ordering gateway, an in-memory ordering service is
/// bootstrapped from the organizations' trust stores.
pub async fn run(
    config_path: PathBuf,
    data_root: Option<PathBuf>,
    verbosity: VerbosityLevel,
) -> Result<()> {
    if verbosity != VerbosityLevel::Minimal {
        print_banner("Channel Run");
    }
    let ctx = load_context(&config_path, data_root.as_deref(), verbosity)?;
    let result = match ctx.remote_orderer() {
        Ok(Some(orderer)) => channel::run(&ctx, orderer.as_ref()).await,
        Ok(None) => {
            ctx.progress("No ordering gateway configured, starting a local ordering service");
            match bootstrap_local_orderer(&ctx) {
                Ok(orderer) => channel::run(&ctx, &orderer).await,
                Err(err) => Err(err),
            }
        }
        Err(err) => Err(err),
    };
    record(&ctx, result, "Run")
}
