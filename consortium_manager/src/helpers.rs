// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Marker files reporting the outcome of a run to whoever supervises the tool.

use crate::error::Result;
use std::{fs, path::Path};

/// Records success: removes a failure marker left by an earlier attempt, then writes the success
/// marker with the completion time.
pub fn mark_success(success_file: &Path, fail_file: &Path) -> Result<()> {
    remove_if_present(fail_file)?;
    write_marker(success_file, &chrono::Utc::now().to_rfc3339())
}

/// Records failure with its reason. A success marker from an earlier run is removed.
pub fn mark_failure(success_file: &Path, fail_file: &Path, reason: &str) -> Result<()> {
    remove_if_present(success_file)?;
    write_marker(
        fail_file,
        &format!("{}\n{reason}", chrono::Utc::now().to_rfc3339()),
    )
}

fn write_marker(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    debug!("Writing marker {path:?}");
    fs::write(path, contents)?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use color_eyre::eyre::Result;
    use predicates::prelude::*;

    #[test]
    fn success_should_replace_an_earlier_failure() -> Result<()> {
        let tmp = assert_fs::TempDir::new()?;
        let success = tmp.child("logs/run.successful");
        let fail = tmp.child("logs/run.fail");

        mark_failure(success.path(), fail.path(), "policy not satisfied")?;
        fail.assert(predicate::str::contains("policy not satisfied"));
        success.assert(predicate::path::missing());

        mark_success(success.path(), fail.path())?;
        success.assert(predicate::path::exists());
        fail.assert(predicate::path::missing());
        Ok(())
    }
}
