// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

mod appender;
mod error;
mod layers;

use crate::error::Result;
use layers::TracingLayers;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use tracing_core::dispatcher::DefaultGuard;
use tracing_subscriber::{prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt};

pub use error::Error;
pub use layers::ReloadHandle;
pub use tracing_appender::non_blocking::WorkerGuard;

// re-exporting the tracing crate's Level as it is used in our public API
pub use tracing_core::Level;

/// Environment variable overriding the default logging targets.
pub const LOG_ENV_VAR: &str = "CONSORTIUM_LOG";

#[derive(Debug, Clone)]
pub enum LogOutputDest {
    Stderr,
    Stdout,
    Path(PathBuf),
}

impl LogOutputDest {
    pub fn parse_from_str(val: &str) -> Result<Self> {
        match val {
            "stdout" => Ok(LogOutputDest::Stdout),
            "stderr" => Ok(LogOutputDest::Stderr),
            "data-dir" => Ok(LogOutputDest::Path(timestamped_log_dir()?)),
            // The directory doesn't need to exist, it is created when logging starts.
            value => Ok(LogOutputDest::Path(PathBuf::from(value))),
        }
    }
}

impl std::fmt::Display for LogOutputDest {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LogOutputDest::Stderr => write!(f, "stderr"),
            LogOutputDest::Stdout => write!(f, "stdout"),
            LogOutputDest::Path(p) => write!(f, "{}", p.to_string_lossy()),
        }
    }
}

/// `<data dir>/consortium/logs/log_<timestamp>`
fn timestamped_log_dir() -> Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    dirs_next::data_dir()
        .map(|dir| {
            dir.join("consortium")
                .join("logs")
                .join(format!("log_{timestamp}"))
        })
        .ok_or_else(|| {
            Error::LoggingConfiguration("could not obtain data directory path".to_string())
        })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogFormat {
    Default,
    Json,
}

impl LogFormat {
    pub fn parse_from_str(val: &str) -> Result<Self> {
        match val {
            "default" => Ok(LogFormat::Default),
            "json" => Ok(LogFormat::Json),
            _ => Err(Error::LoggingConfiguration(
                "The only valid values for this argument are \"default\" or \"json\"".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Default => "default",
            LogFormat::Json => "json",
        }
    }
}

pub struct LogBuilder {
    default_logging_targets: Vec<(String, Level)>,
    output_dest: LogOutputDest,
    format: LogFormat,
    max_log_files: Option<usize>,
    max_archived_log_files: Option<usize>,
    print_updates_to_stdout: bool,
}

impl LogBuilder {
    /// Create a new builder.
    ///
    /// The default targets are used when `CONSORTIUM_LOG` is not set. Logs go to stderr in the
    /// default format unless told otherwise.
    pub fn new(default_logging_targets: Vec<(String, Level)>) -> Self {
        Self {
            default_logging_targets,
            output_dest: LogOutputDest::Stderr,
            format: LogFormat::Default,
            max_log_files: None,
            max_archived_log_files: None,
            print_updates_to_stdout: true,
        }
    }

    pub fn output_dest(&mut self, output_dest: LogOutputDest) {
        self.output_dest = output_dest;
    }

    pub fn format(&mut self, format: LogFormat) {
        self.format = format
    }

    /// The max number of uncompressed log files to store
    pub fn max_log_files(&mut self, files: usize) {
        self.max_log_files = Some(files);
    }

    /// The max number of compressed files to store
    pub fn max_archived_log_files(&mut self, files: usize) {
        self.max_archived_log_files = Some(files);
    }

    /// Whether the builder announces where it logs to on stdout.
    pub fn print_updates_to_stdout(&mut self, print: bool) {
        self.print_updates_to_stdout = print;
    }

    /// Installs the global subscriber, returning the file writer guard if there is one.
    /// The guard must be held for the life of the program.
    pub fn initialize(self) -> Result<(ReloadHandle, Option<WorkerGuard>)> {
        let mut layers = TracingLayers::default();
        let reload_handle = layers.fmt_layer(
            self.default_logging_targets,
            &self.output_dest,
            self.format,
            self.max_log_files,
            self.max_archived_log_files,
            self.print_updates_to_stdout,
        )?;

        if tracing_subscriber::registry()
            .with(layers.layers)
            .try_init()
            .is_err()
        {
            eprintln!("Tried to initialize and set global default subscriber more than once");
        }

        Ok((reload_handle, layers.log_appender_guard))
    }

    /// Logs a single threaded test to the data dir, tracing `test_file_name` and our own crates.
    ///
    /// The subscriber is only the thread default, see
    /// <https://github.com/tokio-rs/tracing/discussions/1626>.
    pub fn init_single_threaded_tokio_test(
        test_file_name: &str,
    ) -> Result<(Option<WorkerGuard>, DefaultGuard)> {
        let layers = Self::get_test_layers(test_file_name)?;
        let log_guard = tracing_subscriber::registry()
            .with(layers.layers)
            .set_default();
        if let Some(test_name) = std::thread::current().name() {
            info!("Running test: {test_name}");
        }
        Ok((layers.log_appender_guard, log_guard))
    }

    /// Logs a multi threaded test to the data dir. Only the first call in a test binary installs
    /// the subscriber; later calls log a warning to stderr and keep the existing one.
    pub fn init_multi_threaded_tokio_test(test_file_name: &str) -> Result<Option<WorkerGuard>> {
        let layers = Self::get_test_layers(test_file_name)?;
        if tracing_subscriber::registry()
            .with(layers.layers)
            .try_init()
            .is_err()
        {
            eprintln!("Multi threaded test logging was already initialised for this binary");
        }
        Ok(layers.log_appender_guard)
    }

    fn get_test_layers(test_file_name: &str) -> Result<TracingLayers> {
        std::env::set_var(LOG_ENV_VAR, format!("{test_file_name}=TRACE,all"));

        let output_dest = match timestamped_log_dir() {
            Ok(dir) => LogOutputDest::Path(dir),
            Err(_) => LogOutputDest::Stdout,
        };
        println!("Logging test at {test_file_name:?} to {output_dest}");

        let mut layers = TracingLayers::default();
        let _reload_handle =
            layers.fmt_layer(vec![], &output_dest, LogFormat::Default, None, None, false)?;
        Ok(layers)
    }
}
