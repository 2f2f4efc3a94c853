// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use super::{connect_orderer, finish, load_context};
use crate::{channel, print_banner, VerbosityLevel};
use color_eyre::Result;
use std::path::PathBuf;

pub async fn add_org(
    config_path: PathBuf,
    data_root: Option<PathBuf>,
    org: String,
    verbosity: VerbosityLevel,
) -> Result<()> {
    if verbosity != VerbosityLevel::Minimal {
        print_banner("Add Organization To Consortium");
    }
    let ctx = load_context(&config_path, data_root.as_deref(), verbosity)?;
    let result = match connect_orderer(&ctx) {
        Ok(orderer) => channel::add_org_to_consortium(&ctx, orderer.as_ref(), &org)
            .await
            .map(|committed| {
                debug!(
                    "'{}' is at sequence {}",
                    committed.channel_id, committed.sequence
                );
            }),
        Err(err) => Err(err),
    };
    let misc = &ctx.config().misc;
    finish(
        result,
        &misc.run_success_file,
        &misc.run_fail_file,
        &format!("Adding {org} to the consortium"),
        verbosity,
    )
}
