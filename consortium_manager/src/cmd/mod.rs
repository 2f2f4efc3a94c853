// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

pub mod channel;
pub mod consortium;
pub mod setup;

use crate::{
    config::NetworkConfig,
    context::NetworkContext,
    error::{Error as WorkflowError, Result as WorkflowResult},
    helpers::{mark_failure, mark_success},
    VerbosityLevel,
};
use color_eyre::{eyre::Report, Help, Result};
use colored::Colorize;
use consortium_channel::OrdererActions;
use std::path::Path;

/// Reads and validates the network configuration.
pub fn load_context(
    config_path: &Path,
    data_root: Option<&Path>,
    verbosity: VerbosityLevel,
) -> Result<NetworkContext> {
    let config = NetworkConfig::load(config_path, data_root)?;
    debug!(
        "Loaded configuration of {} organization(s) from {}",
        config.orgs.len(),
        config_path.display()
    );
    Ok(NetworkContext::new(config, verbosity))
}

/// The ordering gateway named by the configuration.
pub fn connect_orderer(ctx: &NetworkContext) -> WorkflowResult<Box<dyn OrdererActions>> {
    ctx.remote_orderer()?.ok_or(WorkflowError::NoOrderingService)
}

/// Records the outcome of a workflow in its marker files.
pub(crate) fn finish(
    result: WorkflowResult<()>,
    success_file: &Path,
    fail_file: &Path,
    what: &str,
    verbosity: VerbosityLevel,
) -> Result<()> {
    match result {
        Ok(()) => {
            mark_success(success_file, fail_file)?;
            info!("{what} succeeded");
            if verbosity != VerbosityLevel::Minimal {
                println!("{} {what} succeeded", "✓".green());
            }
            Ok(())
        }
        Err(err) => {
            error!("{what} failed: {err}");
            mark_failure(success_file, fail_file, &err.to_string())?;
            println!("{} {what} failed", "✕".red());
            match err {
                WorkflowError::NoOrderingService => Err(Report::new(err).suggestion(
                    "Set 'orderer_url' in the 'misc' section, or use the 'run' command which \
                     starts a local ordering service",
                )),
                err => Err(err.into()),
            }
        }
    }
}
