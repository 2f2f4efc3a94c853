// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{
    certificate, identity, test_utils::FakeCa, CsrBuilder, Error, Identity, IdentityType,
    PrivateKey, Profile, Registrar, RegistrationOutcome, RegistrationRequest, Secret, TrustStore,
};
use assert_fs::prelude::*;
use assert_matches::assert_matches;
use color_eyre::eyre::Result;
use predicates::prelude::*;

const BOOTSTRAP_ADMIN: &str = "admin";
const BOOTSTRAP_SECRET: &str = "adminpw";

async fn start_ca() -> Result<FakeCa> {
    Ok(FakeCa::start("rca-owkin", BOOTSTRAP_ADMIN, BOOTSTRAP_SECRET).await?)
}

fn peer_request(name: &str, secret: &str) -> RegistrationRequest {
    RegistrationRequest {
        name: name.to_string(),
        secret: secret.to_string(),
        kind: IdentityType::Peer,
        affiliation: None,
        attributes: Vec::new(),
        max_enrollments: -1,
    }
}

#[tokio::test]
async fn registered_peer_should_enroll_into_a_trust_store() -> Result<()> {
    let _log_guards =
        consortium_logging::LogBuilder::init_single_threaded_tokio_test("consortium_identity")?;
    let ca = start_ca().await?;
    let client = ca.client()?;
    let tmp = assert_fs::TempDir::new()?;

    let bootstrap = client
        .enroll(
            BOOTSTRAP_ADMIN,
            &Secret::new(BOOTSTRAP_SECRET),
            None,
            Profile::Default,
        )
        .await?;
    Registrar::new(&client, &bootstrap)?
        .register(&peer_request("peer1", "peer1pw"))
        .await?;

    let enrollment = client
        .enroll("peer1", &Secret::new("peer1pw"), None, Profile::Default)
        .await?;
    let msp = tmp.child("org/peer1/msp");
    TrustStore::new(msp.path()).materialize(&enrollment, false)?;

    let signcert = std::fs::read_to_string(msp.child("signcerts/cert.pem").path())?;
    assert_eq!(certificate::common_name(&signcert)?, "peer1");
    msp.child("cacerts/ca.pem")
        .assert(ca.ca_cert_pem().to_string());
    msp.child("keystore/key.pem")
        .assert(predicate::str::contains("PRIVATE KEY"));
    assert!(certificate::is_issued_by(&signcert, ca.ca_cert_pem())?);
    Ok(())
}

#[tokio::test]
async fn registering_twice_should_fail_with_duplicate_identity() -> Result<()> {
    let ca = start_ca().await?;
    let client = ca.client()?;
    let bootstrap = client
        .enroll(
            BOOTSTRAP_ADMIN,
            &Secret::new(BOOTSTRAP_SECRET),
            None,
            Profile::Default,
        )
        .await?;
    let registrar = Registrar::new(&client, &bootstrap)?;
    let request = peer_request("peer2", "peer2pw");

    registrar.register(&request).await?;
    assert_matches!(
        registrar.register(&request).await,
        Err(Error::DuplicateIdentity(name)) if name == "peer2"
    );
    assert_eq!(
        registrar.register_if_absent(&request).await?,
        RegistrationOutcome::AlreadyRegistered
    );
    Ok(())
}

#[tokio::test]
async fn ensure_registered_should_record_the_registration() -> Result<()> {
    let ca = start_ca().await?;
    let client = ca.client()?;
    let bootstrap = client
        .enroll(
            BOOTSTRAP_ADMIN,
            &Secret::new(BOOTSTRAP_SECRET),
            None,
            Profile::Default,
        )
        .await?;
    let registrar = Registrar::new(&client, &bootstrap)?;

    let mut admin = Identity::new("admin-owkin", Secret::new("admin-owkinpw"), IdentityType::Client)?
        .with_attributes(identity::admin_attributes());
    assert_eq!(
        registrar.ensure_registered(&mut admin).await?,
        RegistrationOutcome::Registered
    );
    assert_eq!(admin.state(), crate::EnrollmentState::Registered);
    assert!(ca
        .registered_attributes("admin-owkin")
        .iter()
        .any(|a| a.name == "admin" && a.value == "true" && a.ecert));
    Ok(())
}

#[tokio::test]
async fn registrar_without_rights_should_be_refused() -> Result<()> {
    let ca = start_ca().await?;
    let client = ca.client()?;
    let bootstrap = client
        .enroll(
            BOOTSTRAP_ADMIN,
            &Secret::new(BOOTSTRAP_SECRET),
            None,
            Profile::Default,
        )
        .await?;

    let mut user = RegistrationRequest::from(
        &Identity::new("user-owkin", Secret::new("user-owkinpw"), IdentityType::User)?
            .with_attributes(identity::user_attributes()),
    );
    Registrar::new(&client, &bootstrap)?.register(&user).await?;
    let user_enrollment = client
        .enroll("user-owkin", &Secret::new("user-owkinpw"), None, Profile::Default)
        .await?;

    user.name = "peer9".to_string();
    user.kind = IdentityType::Peer;
    assert_matches!(
        Registrar::new(&client, &user_enrollment)?.register(&user).await,
        Err(Error::Permission(name, _)) if name == "peer9"
    );
    assert!(!ca.is_registered("peer9"));
    Ok(())
}

#[tokio::test]
async fn wrong_secret_should_not_enroll() -> Result<()> {
    let ca = start_ca().await?;
    let result = ca
        .client()?
        .enroll(BOOTSTRAP_ADMIN, &Secret::new("nope"), None, Profile::Default)
        .await;
    assert_matches!(result, Err(Error::Auth(_)));
    assert_eq!(ca.enrollment_count(BOOTSTRAP_ADMIN), 0);
    Ok(())
}

#[tokio::test]
async fn exhausted_quota_should_map_to_quota_exceeded() -> Result<()> {
    let ca = start_ca().await?;
    let client = ca.client()?;
    ca.set_max_enrollments(BOOTSTRAP_ADMIN, 1);
    let secret = Secret::new(BOOTSTRAP_SECRET);

    client
        .enroll(BOOTSTRAP_ADMIN, &secret, None, Profile::Default)
        .await?;
    assert_matches!(
        client
            .enroll(BOOTSTRAP_ADMIN, &secret, None, Profile::Default)
            .await,
        Err(Error::QuotaExceeded(_))
    );
    Ok(())
}

#[tokio::test]
async fn registered_enrollment_limit_should_hold() -> Result<()> {
    let ca = start_ca().await?;
    let client = ca.client()?;
    let bootstrap = client
        .enroll(
            BOOTSTRAP_ADMIN,
            &Secret::new(BOOTSTRAP_SECRET),
            None,
            Profile::Default,
        )
        .await?;

    let mut user = Identity::new("user-owkin", Secret::new("user-owkinpw"), IdentityType::User)?
        .with_affiliation("owkin.department1")
        .with_max_enrollments(1);
    let request = RegistrationRequest::from(&user);
    assert_eq!(request.affiliation.as_deref(), Some("owkin.department1"));
    assert_eq!(request.max_enrollments, 1);
    Registrar::new(&client, &bootstrap)?
        .ensure_registered(&mut user)
        .await?;

    let secret = Secret::new("user-owkinpw");
    client
        .enroll("user-owkin", &secret, None, Profile::Default)
        .await?;
    assert_matches!(
        client
            .enroll("user-owkin", &secret, None, Profile::Default)
            .await,
        Err(Error::QuotaExceeded(_))
    );
    Ok(())
}

#[tokio::test]
async fn tls_enrollment_with_own_csr_should_keep_the_key_local() -> Result<()> {
    let ca = start_ca().await?;
    let client = ca.client()?;
    let key = PrivateKey::generate()?;
    let csr = CsrBuilder::new(BOOTSTRAP_ADMIN)
        .host("peer1-owkin")
        .build(&key)?;

    let enrollment = client
        .enroll(
            BOOTSTRAP_ADMIN,
            &Secret::new(BOOTSTRAP_SECRET),
            Some(&csr),
            Profile::Tls,
        )
        .await?;

    assert!(enrollment.private_key().is_none());
    let usages = certificate::key_usages(enrollment.cert_pem())?;
    assert!(usages.server_auth && usages.client_auth);
    Ok(())
}

#[tokio::test]
async fn certificate_not_fitting_the_profile_should_be_rejected() -> Result<()> {
    let ca = start_ca().await?;
    ca.ignore_profiles();

    let result = ca
        .client()?
        .enroll(
            BOOTSTRAP_ADMIN,
            &Secret::new(BOOTSTRAP_SECRET),
            None,
            Profile::Tls,
        )
        .await;
    assert_matches!(result, Err(Error::ProfileMismatch { profile, .. }) if profile == "tls");
    Ok(())
}

#[tokio::test]
async fn ca_info_should_return_the_root_certificate() -> Result<()> {
    let ca = start_ca().await?;
    let info = ca.client()?.get_ca_info().await?;
    assert_eq!(info.ca_name, "rca-owkin");
    assert_eq!(info.ca_chain_pem, ca.ca_cert_pem());
    Ok(())
}
