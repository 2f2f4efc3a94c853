// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

mod common;

use assert_fs::prelude::*;
use color_eyre::Result;
use common::TestNetwork;
use consortium_identity::{certificate, identity::Attribute, EnrollmentState, Identity};
use consortium_manager::provision;
use predicates::prelude::*;

#[tokio::test(flavor = "multi_thread")]
async fn peer_org_setup_should_lay_out_every_msp_and_tls_directory() -> Result<()> {
    let network = TestNetwork::start(&["owkin"]).await?;
    let ctx = network.context()?;
    let ca = network.ca("owkin");

    provision::setup(&ctx, Some("owkin")).await?;

    for name in ["peer1", "peer2", "admin-owkin", "user-owkin"] {
        assert!(ca.is_registered(name), "{name} was not registered");
    }
    assert!(ca
        .registered_attributes("admin-owkin")
        .contains(&Attribute::new("hf.Registrar.Roles", "client")));

    network
        .dir
        .child("orgs/owkin/ca-cert.pem")
        .assert(predicate::str::contains(ca.ca_cert_pem().trim()));
    let admin_msp = network.dir.child("orgs/owkin/admin/msp");
    admin_msp
        .child("admincerts/cert.pem")
        .assert(predicate::str::contains("BEGIN CERTIFICATE"));
    admin_msp
        .child("tlscacerts")
        .assert(predicate::path::is_dir());
    network
        .dir
        .child("orgs/owkin/user/msp/signcerts/cert.pem")
        .assert(predicate::path::exists());

    let peer_msp = network.dir.child("conf/owkin/peer1/msp");
    let signcert = std::fs::read_to_string(peer_msp.child("signcerts/cert.pem").path())?;
    assert_eq!(certificate::common_name(&signcert)?, "peer1");
    peer_msp
        .child("cacerts/ca.pem")
        .assert(predicate::str::contains(ca.ca_cert_pem().trim()));
    let admin_cert = std::fs::read_to_string(admin_msp.child("signcerts/cert.pem").path())?;
    peer_msp
        .child("admincerts/admin-owkin-cert.pem")
        .assert(admin_cert);

    let tls = network.dir.child("orgs/owkin/tls/peer1");
    for file in [
        "server/server.crt",
        "server/server.key",
        "server/server-ca.pem",
        "client/client.crt",
        "client/client.key",
        "client/client-ca.pem",
    ] {
        tls.child(file).assert(predicate::path::exists());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn setup_should_be_safe_to_run_again() -> Result<()> {
    let network = TestNetwork::start(&["owkin"]).await?;
    let ctx = network.context()?;

    provision::setup(&ctx, Some("owkin")).await?;
    let admin_cert = network.path("orgs/owkin/admin/msp/signcerts/cert.pem");
    let first = std::fs::read_to_string(&admin_cert)?;

    provision::setup(&ctx, Some("owkin")).await?;
    assert_eq!(std::fs::read_to_string(&admin_cert)?, first);
    assert_eq!(network.ca("owkin").enrollment_count("admin-owkin"), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn rerun_should_complete_an_interrupted_admin_msp() -> Result<()> {
    let network = TestNetwork::start(&["owkin"]).await?;
    let ctx = network.context()?;

    provision::setup(&ctx, Some("owkin")).await?;
    let admin_msp = network.dir.child("orgs/owkin/admin/msp");
    std::fs::remove_dir_all(admin_msp.child("tlscacerts").path())?;
    admin_msp
        .child("intermediatecerts/ica.pem")
        .write_str("stale")?;

    provision::setup(&ctx, Some("owkin")).await?;
    admin_msp
        .child("tlscacerts/ca.pem")
        .assert(predicate::str::contains("BEGIN CERTIFICATE"));
    admin_msp
        .child("intermediatecerts/ica.pem")
        .assert(predicate::path::missing());
    assert_eq!(network.ca("owkin").enrollment_count("admin-owkin"), 1);
    Ok(())
}

fn states(identities: &[Identity]) -> Vec<(String, EnrollmentState)> {
    identities
        .iter()
        .map(|identity| (identity.name().to_string(), identity.state()))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn setup_should_track_every_enrollment() -> Result<()> {
    let network = TestNetwork::start(&["owkin"]).await?;
    let ctx = network.context()?;
    let org = ctx.org("owkin")?;

    let first = provision::setup_org(&ctx, org).await?;
    assert_eq!(
        states(&first),
        vec![
            ("admin".to_string(), EnrollmentState::Enrolled { count: 1 }),
            ("peer1".to_string(), EnrollmentState::Enrolled { count: 3 }),
            ("peer2".to_string(), EnrollmentState::Enrolled { count: 3 }),
            ("admin-owkin".to_string(), EnrollmentState::Enrolled { count: 1 }),
            ("user-owkin".to_string(), EnrollmentState::Enrolled { count: 1 }),
        ]
    );

    // existing trust stores are kept, nodes are enrolled again
    let second = provision::setup_org(&ctx, org).await?;
    assert_eq!(
        states(&second)[3..],
        [
            ("admin-owkin".to_string(), EnrollmentState::Registered),
            ("user-owkin".to_string(), EnrollmentState::Registered),
        ]
    );
    assert_eq!(second[1].state(), EnrollmentState::Enrolled { count: 3 });
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn orderer_org_setup_should_enroll_orderers_without_users() -> Result<()> {
    let network = TestNetwork::start(&["owkin"]).await?;
    let ctx = network.context()?;

    provision::setup(&ctx, Some("orderer")).await?;

    let ca = network.ca("orderer");
    assert!(ca.is_registered("orderer1"));
    assert!(!ca.is_registered("user-orderer"));
    assert_eq!(
        ca.registered_attributes("admin-orderer"),
        vec![Attribute::new("admin", "true").in_ecert()]
    );

    let msp = network.dir.child("conf/orderer/orderer1/msp");
    let signcert = std::fs::read_to_string(msp.child("signcerts/cert.pem").path())?;
    msp.child("admincerts/orderer1-cert.pem").assert(signcert);
    network
        .dir
        .child("orgs/orderer/user")
        .assert(predicate::path::missing());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_org_should_not_be_set_up() -> Result<()> {
    let network = TestNetwork::start(&["owkin"]).await?;
    let ctx = network.context()?;
    assert!(provision::setup(&ctx, Some("chu-nantes")).await.is_err());
    assert!(!network.ca("owkin").is_registered("peer1"));
    Ok(())
}
