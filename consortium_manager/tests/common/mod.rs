// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

#![allow(dead_code)]

use assert_fs::TempDir;
use color_eyre::Result;
use consortium_identity::test_utils::FakeCa;
use consortium_manager::{config::NetworkConfig, context::NetworkContext, VerbosityLevel};
use serde_json::{json, Value};
use std::path::PathBuf;

pub const BOOTSTRAP_NAME: &str = "admin";
pub const BOOTSTRAP_PASS: &str = "adminpw";

/// Organizations of a network, each with its own certificate authority, and the configuration
/// document describing them in a temporary data root.
pub struct TestNetwork {
    pub dir: TempDir,
    pub cas: Vec<(String, FakeCa)>,
    pub config_path: PathBuf,
}

impl TestNetwork {
    /// Starts `peer_orgs` and an ordering organization named "orderer".
    pub async fn start(peer_orgs: &[&str]) -> Result<Self> {
        let dir = TempDir::new()?;
        let mut cas = Vec::new();
        let mut orgs = Vec::new();
        for name in peer_orgs {
            let ca = FakeCa::start(&format!("rca-{name}"), BOOTSTRAP_NAME, BOOTSTRAP_PASS).await?;
            orgs.push(peer_org(name, ca.port()));
            cas.push((name.to_string(), ca));
        }
        let ca = FakeCa::start("rca-orderer", BOOTSTRAP_NAME, BOOTSTRAP_PASS).await?;
        orgs.push(orderer_org("orderer", ca.port()));
        cas.push(("orderer".to_string(), ca));

        let config_path = dir.path().join("network.json");
        std::fs::write(
            &config_path,
            serde_json::to_string_pretty(&json!({ "orgs": orgs }))?,
        )?;
        Ok(Self {
            dir,
            cas,
            config_path,
        })
    }

    pub fn ca(&self, org: &str) -> &FakeCa {
        self.cas
            .iter()
            .find(|(name, _)| name == org)
            .map(|(_, ca)| ca)
            .unwrap_or_else(|| panic!("no CA for {org}"))
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn context(&self) -> Result<NetworkContext> {
        let config = NetworkConfig::load(&self.config_path, None)?;
        Ok(NetworkContext::new(config, VerbosityLevel::Minimal))
    }
}

fn ca(name: &str, port: u16) -> Value {
    json!({
        "name": format!("rca-{name}"),
        "scheme": "http",
        "host": "127.0.0.1",
        "port": port,
        "certfile": format!("orgs/{name}/ca-cert.pem"),
        "wait_secs": 10
    })
}

fn user(name: &str, home: String) -> Value {
    json!({ "name": name, "pass": format!("{name}pw"), "home": home })
}

pub fn peer_org(name: &str, ca_port: u16) -> Value {
    json!({
        "name": name,
        "msp_id": format!("{name}MSP"),
        "kind": "peer",
        "ca": ca(name, ca_port),
        "users": {
            "bootstrap_admin": { "name": BOOTSTRAP_NAME, "pass": BOOTSTRAP_PASS, "home": format!("orgs/{name}") },
            "admin": user(&format!("admin-{name}"), format!("orgs/{name}/admin")),
            "user": user(&format!("user-{name}"), format!("orgs/{name}/user"))
        },
        "core_dir": format!("conf/{name}"),
        "nodes": [
            {
                "name": "peer1",
                "pass": "peer1pw",
                "host": format!("peer1-{name}"),
                "port": 7051,
                "anchor": true,
                "tls_dir": format!("orgs/{name}/tls/peer1")
            },
            {
                "name": "peer2",
                "pass": "peer2pw",
                "host": format!("peer2-{name}"),
                "port": 7051,
                "tls_dir": format!("orgs/{name}/tls/peer2")
            }
        ]
    })
}

pub fn orderer_org(name: &str, ca_port: u16) -> Value {
    json!({
        "name": name,
        "msp_id": format!("{name}MSP"),
        "kind": "orderer",
        "ca": ca(name, ca_port),
        "users": {
            "bootstrap_admin": { "name": BOOTSTRAP_NAME, "pass": BOOTSTRAP_PASS, "home": format!("orgs/{name}") },
            "admin": user(&format!("admin-{name}"), format!("orgs/{name}/admin"))
        },
        "core_dir": format!("conf/{name}"),
        "nodes": [
            {
                "name": "orderer1",
                "pass": "orderer1pw",
                "host": format!("orderer1-{name}"),
                "port": 7050,
                "tls_dir": format!("orgs/{name}/tls/orderer1")
            }
        ]
    })
}
