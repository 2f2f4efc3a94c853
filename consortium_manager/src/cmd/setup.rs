// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use super::{finish, load_context};
use crate::{print_banner, provision, VerbosityLevel};
use color_eyre::Result;
use std::path::PathBuf;

/// Registers and enrolls the identities of one organization, or of all of them.
pub async fn setup(
    config_path: PathBuf,
    data_root: Option<PathBuf>,
    org: Option<String>,
    verbosity: VerbosityLevel,
) -> Result<()> {
    if verbosity != VerbosityLevel::Minimal {
        print_banner("Network Setup");
    }
    info!("Setting up the network described by {}", config_path.display());

    let ctx = load_context(&config_path, data_root.as_deref(), verbosity)?;
    let result = provision::setup(&ctx, org.as_deref()).await;
    let misc = &ctx.config().misc;
    finish(
        result,
        &misc.setup_success_file,
        &misc.setup_fail_file,
        "Setup",
        verbosity,
    )
}
