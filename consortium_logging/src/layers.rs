// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{
    appender::{self, RotationLimits},
    error::{Error, Result},
    LogFormat, LogOutputDest, LOG_ENV_VAR,
};
use std::collections::BTreeMap;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_core::{Event, Level, Subscriber};
use tracing_subscriber::{
    filter::Targets,
    fmt::{
        self as tracing_fmt,
        format::Writer,
        time::{FormatTime, SystemTime},
        FmtContext, FormatEvent, FormatFields,
    },
    layer::Filter,
    registry::LookupSpan,
    reload::{self, Handle},
    Layer, Registry,
};

const MAX_LOG_SIZE: usize = 20 * 1024 * 1024;
const MAX_UNCOMPRESSED_LOG_FILES: usize = 10;
const MAX_LOG_FILES: usize = 1000;
// Trace everything we own.
const ALL_KEYWORD: &str = "all";
// Trace everything we own, debug the HTTP stack talking to the CA and orderer.
const VERBOSE_KEYWORD: &str = "v";

/// Crates of this workspace, traced when the `all` or `v` keyword is used.
const OWN_CRATES: [&str; 5] = [
    "consortium",
    "consortium_channel",
    "consortium_identity",
    "consortium_logging",
    "consortium_manager",
];
const HTTP_CRATES: [&str; 3] = ["reqwest", "hyper", "rustls"];

type BoxedFilter = Box<dyn Filter<Registry> + Send + Sync>;

/// Handle that changes the log targets of a running subscriber.
pub struct ReloadHandle(pub(crate) Handle<BoxedFilter, Registry>);

impl ReloadHandle {
    /// Replace the active targets with the ones parsed from a CSV value, using the same syntax
    /// as the `CONSORTIUM_LOG` variable, e.g. `consortium_channel=DEBUG,all`.
    pub fn modify_log_level(&self, logging_value: &str) -> Result<()> {
        let targets = get_logging_targets(logging_value)?;
        self.0.modify(|filter| {
            *filter = Box::new(Targets::new().with_targets(targets));
        })?;
        Ok(())
    }
}

/// Formats `[time LEVEL module/span/span] message fields`.
#[derive(Default)]
pub(crate) struct LogFormatter;

impl<S, N> FormatEvent<S, N> for LogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let module = metadata.module_path().unwrap_or("<unknown module>");

        write!(writer, "[")?;
        SystemTime.format_time(&mut writer)?;
        write!(writer, " {} {module}", metadata.level())?;
        ctx.visit_spans(|span| write!(writer, "/{}", span.name()))?;
        write!(writer, "] ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// The subscriber layers composed by the builder, plus the guard of the file writer if any.
#[derive(Default)]
pub(crate) struct TracingLayers {
    pub(crate) layers: Vec<Box<dyn Layer<Registry> + Send + Sync>>,
    pub(crate) log_appender_guard: Option<WorkerGuard>,
}

impl TracingLayers {
    pub(crate) fn fmt_layer(
        &mut self,
        default_logging_targets: Vec<(String, Level)>,
        output_dest: &LogOutputDest,
        format: LogFormat,
        max_uncompressed_log_files: Option<usize>,
        max_compressed_log_files: Option<usize>,
        print_updates_to_stdout: bool,
    ) -> Result<ReloadHandle> {
        let layer = match output_dest {
            LogOutputDest::Stdout => {
                if print_updates_to_stdout {
                    println!("Logging to stdout");
                }
                tracing_fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .event_format(LogFormatter)
                    .boxed()
            }
            LogOutputDest::Stderr => tracing_fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .event_format(LogFormatter)
                .with_writer(std::io::stderr)
                .boxed(),
            LogOutputDest::Path(path) => {
                std::fs::create_dir_all(path)?;
                if print_updates_to_stdout {
                    println!("Logging to directory: {path:?}");
                }

                let limits = rotation_limits(max_uncompressed_log_files, max_compressed_log_files);
                let (writer, guard) = appender::file_rotater(path, limits);
                self.log_appender_guard = Some(guard);

                match format {
                    LogFormat::Json => tracing_fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_writer(writer)
                        .boxed(),
                    LogFormat::Default => tracing_fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer)
                        .event_format(LogFormatter)
                        .boxed(),
                }
            }
        };

        let targets = match std::env::var(LOG_ENV_VAR) {
            Ok(value) => {
                if print_updates_to_stdout {
                    println!("Using {LOG_ENV_VAR}={value}");
                }
                get_logging_targets(&value)?
            }
            Err(_) => default_logging_targets,
        };

        let filter: BoxedFilter = Box::new(Targets::new().with_targets(targets));
        let (filter, handle) = reload::Layer::new(filter);
        self.layers.push(Box::new(layer.with_filter(filter)));

        Ok(ReloadHandle(handle))
    }
}

fn rotation_limits(uncompressed: Option<usize>, compressed: Option<usize>) -> RotationLimits {
    let uncompressed_files = uncompressed.unwrap_or(MAX_UNCOMPRESSED_LOG_FILES);
    // the total must exceed the uncompressed count, otherwise nothing is ever compressed
    let max_files = match compressed {
        Some(compressed) => compressed.saturating_add(uncompressed_files),
        None => std::cmp::max(uncompressed_files, MAX_LOG_FILES),
    };
    RotationLimits {
        max_bytes: MAX_LOG_SIZE,
        uncompressed_files,
        max_files,
    }
}

/// Parses a CSV of `target=LEVEL` entries, e.g. `CONSORTIUM_LOG=reqwest=DEBUG,all`.
///
/// A target without a level is traced. The `all` and `v` keywords expand to the workspace crates;
/// an explicit entry for the same target wins over the keyword expansion.
pub(crate) fn get_logging_targets(logging_value: &str) -> Result<Vec<(String, Level)>> {
    let mut explicit = BTreeMap::new();
    let mut all = false;
    let mut verbose = false;

    for entry in logging_value.split(',').map(str::trim) {
        match entry {
            "" => continue,
            ALL_KEYWORD => all = true,
            VERBOSE_KEYWORD => verbose = true,
            entry => {
                let mut split = entry.split('=');
                let target = split.next().filter(|t| !t.is_empty()).ok_or_else(|| {
                    Error::LoggingConfiguration(format!("No target name in log entry '{entry}'"))
                })?;
                let level = split.next().unwrap_or("trace");
                explicit.insert(target.to_string(), get_log_level_from_str(level)?);
            }
        }
    }

    let mut targets = BTreeMap::new();
    if all || verbose {
        for krate in OWN_CRATES {
            targets.insert(krate.to_string(), Level::TRACE);
        }
    }
    if verbose {
        for krate in HTTP_CRATES {
            targets.insert(krate.to_string(), Level::DEBUG);
        }
    }
    targets.extend(explicit);
    Ok(targets.into_iter().collect())
}

pub(crate) fn get_log_level_from_str(log_level: &str) -> Result<Level> {
    match log_level.to_lowercase().as_str() {
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(Error::LoggingConfiguration(format!(
            "Log level {log_level} is not supported"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_target_should_override_keyword() -> Result<()> {
        let targets = get_logging_targets("consortium_channel=WARN,all")?;
        assert!(targets.contains(&("consortium_channel".to_string(), Level::WARN)));
        assert!(targets.contains(&("consortium_identity".to_string(), Level::TRACE)));
        assert!(!targets.iter().any(|(t, _)| t == "reqwest"));
        Ok(())
    }

    #[test]
    fn verbose_keyword_should_include_the_http_stack() -> Result<()> {
        let targets = get_logging_targets("v")?;
        assert!(targets.contains(&("reqwest".to_string(), Level::DEBUG)));
        assert!(targets.contains(&("consortium_manager".to_string(), Level::TRACE)));
        Ok(())
    }

    #[test]
    fn target_without_level_should_be_traced() -> Result<()> {
        let targets = get_logging_targets("hyper")?;
        assert_eq!(targets, vec![("hyper".to_string(), Level::TRACE)]);
        Ok(())
    }

    #[test]
    fn unknown_level_should_be_rejected() {
        assert!(matches!(
            get_logging_targets("consortium=LOUD"),
            Err(Error::LoggingConfiguration(_))
        ));
    }

    #[test]
    fn rotation_limits_should_keep_total_above_uncompressed() {
        let limits = rotation_limits(Some(5), Some(20));
        assert_eq!(limits.uncompressed_files, 5);
        assert_eq!(limits.max_files, 25);

        let limits = rotation_limits(None, None);
        assert_eq!(limits.max_files, MAX_LOG_FILES);
    }
}
