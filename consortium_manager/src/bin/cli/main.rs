// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use clap::{Parser, Subcommand};
use color_eyre::Result;
use consortium_logging::{LogBuilder, LogFormat, LogOutputDest};
use consortium_manager::{cmd, VerbosityLevel};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(disable_version_flag = true)]
pub(crate) struct Cmd {
    /// Available sub commands.
    #[clap(subcommand)]
    pub cmd: Option<SubCmd>,

    /// The JSON document describing the organizations of the network.
    #[clap(
        long,
        global = true,
        env = "CONSORTIUM_CONFIG",
        default_value = "network.json"
    )]
    config: PathBuf,

    /// Resolve the relative paths of the configuration against this directory.
    ///
    /// By default they are resolved against the directory holding the configuration.
    #[clap(long, global = true, env = "CONSORTIUM_DATA_ROOT")]
    data_root: Option<PathBuf>,

    /// Output debug-level logging.
    #[clap(long, conflicts_with = "trace")]
    debug: bool,

    /// Specify the logging format.
    ///
    /// Valid values are "default" or "json".
    #[clap(long, value_parser = LogFormat::parse_from_str)]
    log_format: Option<LogFormat>,

    /// Specify the logging output destination.
    ///
    /// Valid values are "stdout", "stderr", "data-dir", or a custom path. The default is stderr.
    #[clap(long, value_parser = LogOutputDest::parse_from_str)]
    log_output_dest: Option<LogOutputDest>,

    /// The maximum number of uncompressed log files kept when logging to a directory.
    #[clap(long)]
    max_log_files: Option<usize>,

    /// The maximum number of compressed log files kept when logging to a directory.
    #[clap(long)]
    max_archived_log_files: Option<usize>,

    /// Output trace-level logging.
    #[clap(long, conflicts_with = "debug")]
    trace: bool,

    #[clap(short, long, action = clap::ArgAction::Count, default_value_t = 2)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum SubCmd {
    /// Register and enroll the identities of the organizations.
    ///
    /// The bootstrap admin of each organization's CA registers the nodes, the admin and the user,
    /// then each of them is enrolled into its MSP directory. Nodes also receive TLS server and
    /// client certificates. Identities that already exist are left as they are, so the command
    /// can be run again after a failure.
    #[clap(name = "setup")]
    Setup {
        /// Only set up this organization.
        #[clap(long)]
        org: Option<String>,
    },
    /// Create the channel, join the peers and add every peer organization to it.
    ///
    /// Without an 'orderer_url' in the configuration, an in-memory ordering service is started
    /// from the trust stores written by 'setup'.
    #[clap(name = "run")]
    Run {},
    /// Manage the application channel through the ordering gateway.
    #[clap(name = "channel", subcommand)]
    Channel(ChannelSubCmd),
    /// Manage the consortium through the ordering gateway.
    #[clap(name = "consortium", subcommand)]
    Consortium(ConsortiumSubCmd),
}

#[derive(Subcommand, Debug)]
pub enum ChannelSubCmd {
    /// Create the channel as the admin of an organization.
    #[clap(name = "create")]
    Create {
        /// The organization creating the channel.
        #[clap(long)]
        org: String,
        /// The consortium members of the new channel.
        ///
        /// The argument can be used multiple times. By default only the creating organization is
        /// a member.
        #[clap(long = "member")]
        members: Vec<String>,
    },
    /// Join every peer of an organization to the channel.
    #[clap(name = "join")]
    Join {
        #[clap(long)]
        org: String,
    },
    /// Nominate the anchor peer of an organization.
    #[clap(name = "anchor-peers")]
    AnchorPeers {
        #[clap(long)]
        org: String,
    },
    /// Add an organization to the channel.
    ///
    /// The admins of the signing organizations sign the update in the given order, and the last
    /// of them submits it. A majority of the channel's members must sign.
    #[clap(name = "add-org")]
    AddOrg {
        /// The organization to add.
        #[clap(long)]
        org: String,
        /// An organization whose admin signs the update.
        ///
        /// The argument can be used multiple times.
        #[clap(long = "signer")]
        signers: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConsortiumSubCmd {
    /// Add an organization to the consortium, as the admin of the ordering organization.
    #[clap(name = "add-org")]
    AddOrg {
        #[clap(long)]
        org: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cmd::parse();
    let verbosity = VerbosityLevel::from(args.verbose);

    let _log_handle = if args.debug || args.trace {
        let level = if args.debug {
            Level::DEBUG
        } else {
            Level::TRACE
        };
        let mut log_builder = get_log_builder(level, args.log_output_dest)?;
        if let Some(format) = args.log_format {
            log_builder.format(format);
        }
        if let Some(files) = args.max_log_files {
            log_builder.max_log_files(files);
        }
        if let Some(files) = args.max_archived_log_files {
            log_builder.max_archived_log_files(files);
        }
        log_builder.initialize()?.1
    } else {
        None
    };

    tracing::info!("Executing cmd: {:?}", args.cmd);

    let config = args.config;
    let data_root = args.data_root;
    match args.cmd {
        Some(SubCmd::Setup { org }) => cmd::setup::setup(config, data_root, org, verbosity).await,
        Some(SubCmd::Run {}) => cmd::channel::run(config, data_root, verbosity).await,
        Some(SubCmd::Channel(channel_command)) => match channel_command {
            ChannelSubCmd::Create { org, members } => {
                cmd::channel::create(config, data_root, org, members, verbosity).await
            }
            ChannelSubCmd::Join { org } => {
                cmd::channel::join(config, data_root, org, verbosity).await
            }
            ChannelSubCmd::AnchorPeers { org } => {
                cmd::channel::anchor_peers(config, data_root, org, verbosity).await
            }
            ChannelSubCmd::AddOrg { org, signers } => {
                cmd::channel::add_org(config, data_root, org, signers, verbosity).await
            }
        },
        Some(SubCmd::Consortium(ConsortiumSubCmd::AddOrg { org })) => {
            cmd::consortium::add_org(config, data_root, org, verbosity).await
        }
        None => Ok(()),
    }
}

fn get_log_builder(level: Level, output_dest: Option<LogOutputDest>) -> Result<LogBuilder> {
    let logging_targets = vec![
        ("consortium".to_string(), level),
        ("consortium_channel".to_string(), level),
        ("consortium_identity".to_string(), level),
        ("consortium_manager".to_string(), level),
    ];
    let mut log_builder = LogBuilder::new(logging_targets);
    log_builder.output_dest(output_dest.unwrap_or(LogOutputDest::Stderr));
    log_builder.print_updates_to_stdout(false);
    Ok(log_builder)
}
