// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use std::{
    fmt, io,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};

const DEFAULT_LOG_FILE_STEM: &str = "consortium";

/// Size and retention limits applied to a rotating log directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RotationLimits {
    /// The size a log file can grow to before it is rotated.
    pub(crate) max_bytes: usize,
    /// Rotated files kept uncompressed. Must be lower than `max_files` for compression to kick in.
    pub(crate) uncompressed_files: usize,
    /// Total number of files kept. Older files are deleted.
    pub(crate) max_files: usize,
}

/// Returns a non-blocking writer that rotates files under `dir`.
///
/// The file name is derived from the running binary, so the `consortium` CLI and any test binary
/// write to distinguishable files inside the same directory.
pub(crate) fn file_rotater(dir: &Path, limits: RotationLimits) -> (NonBlocking, WorkerGuard) {
    let appender = RotatingFileAppender::new(
        dir.join(format!("{}.log", log_file_stem())),
        limits,
    );

    // never drop lines
    NonBlockingBuilder::default().lossy(false).finish(appender)
}

fn log_file_stem() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| DEFAULT_LOG_FILE_STEM.to_string())
}

/// A `std::io::Write` over `file_rotate`, keeping the most recent file name stable so it can be
/// followed with `tail -f`.
pub(crate) struct RotatingFileAppender {
    path: PathBuf,
    writer: FileRotate<AppendTimestamp>,
}

impl RotatingFileAppender {
    pub(crate) fn new(path: PathBuf, limits: RotationLimits) -> Self {
        let writer = FileRotate::new(
            &path,
            AppendTimestamp::default(FileLimit::MaxFiles(limits.max_files)),
            ContentLimit::BytesSurpassed(limits.max_bytes),
            Compression::OnRotate(limits.uncompressed_files),
            #[cfg(unix)]
            None,
        );
        Self { path, writer }
    }
}

impl io::Write for RotatingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl fmt::Debug for RotatingFileAppender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingFileAppender")
            .field("path", &self.path)
            .finish()
    }
}
