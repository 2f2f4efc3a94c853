// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

mod common;

use assert_cmd::{assert::OutputAssertExt, cargo::CommandCargoExt};
use assert_fs::prelude::*;
use color_eyre::Result;
use common::TestNetwork;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn help_should_list_the_workflows() -> Result<()> {
    Command::cargo_bin("consortium")?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("channel"))
        .stdout(predicate::str::contains("consortium"));
    Ok(())
}

#[test]
fn missing_configuration_should_fail() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    Command::cargo_bin("consortium")?
        .arg("setup")
        .arg("--config")
        .arg(dir.child("absent.json").path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.json"));
    Ok(())
}

#[test]
fn channel_commands_should_require_an_ordering_gateway() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let config = dir.child("network.json");
    config.write_str(
        &serde_json::json!({ "orgs": [common::peer_org("owkin", 7054)] }).to_string(),
    )?;
    Command::cargo_bin("consortium")?
        .args(["channel", "join", "--org", "owkin", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No ordering service is configured"));
    dir.child("logs/run.fail")
        .assert(predicate::str::contains("No ordering service is configured"));
    dir.child("logs/run.successful")
        .assert(predicate::path::missing());

    Command::cargo_bin("consortium")?
        .args(["consortium", "add-org", "--org", "owkin", "--config"])
        .arg(config.path())
        .assert()
        .failure();
    dir.child("logs/run.fail")
        .assert(predicate::str::contains("No ordering service is configured"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn setup_then_run_should_write_the_success_markers() -> Result<()> {
    let network = TestNetwork::start(&["owkin", "chu-nantes"]).await?;

    Command::cargo_bin("consortium")?
        .arg("setup")
        .arg("--config")
        .arg(&network.config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Setup succeeded"));
    network
        .dir
        .child("logs/setup.successful")
        .assert(predicate::path::exists());
    network
        .dir
        .child("logs/setup.fail")
        .assert(predicate::path::missing());

    Command::cargo_bin("consortium")?
        .arg("run")
        .arg("--config")
        .arg(&network.config_path)
        .assert()
        .success();
    network
        .dir
        .child("logs/run.successful")
        .assert(predicate::path::exists());
    network
        .dir
        .child("logs/run.fail")
        .assert(predicate::path::missing());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_setup_should_write_the_failure_marker() -> Result<()> {
    let network = TestNetwork::start(&["owkin"]).await?;

    Command::cargo_bin("consortium")?
        .arg("setup")
        .arg("--org")
        .arg("chu-nantes")
        .arg("--config")
        .arg(&network.config_path)
        .assert()
        .failure();
    network
        .dir
        .child("logs/setup.fail")
        .assert(predicate::str::contains("chu-nantes"));
    network
        .dir
        .child("logs/setup.successful")
        .assert(predicate::path::missing());
    Ok(())
}
