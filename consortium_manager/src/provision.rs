// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Provisioning of an organization: registration of its identities with the organization's CA,
//! enrollment of the admin and user trust stores, and the TLS and MSP material of every node.

use crate::{
    config::{NodeConfig, OrgConfig, OrgKind, UserConfig},
    context::NetworkContext,
    error::{Error, Result},
};
use consortium_identity::{
    identity::{admin_attributes, orderer_admin_attributes, user_attributes},
    liveness,
    trust_store::write_if_changed,
    CaClient, Csr, CsrBuilder, Enrollment, Identity, IdentityType, PrivateKey, Profile, Registrar,
    RegistrationOutcome, TlsLayout, TrustStore,
};

/// Waits for the CA to accept connections, makes sure its root certificate is on disk and
/// enrolls the bootstrap identity the CA was started with.
pub async fn enroll_bootstrap_admin(
    ctx: &NetworkContext,
    org: &OrgConfig,
) -> Result<(CaClient, Identity, Enrollment)> {
    ctx.progress(&format!("Waiting for {} to start...", org.ca.name));
    liveness::wait_for_port(&org.ca.host, org.ca.port, org.ca.wait()).await?;

    let client = ctx.ca_client(org).await?;
    if !org.ca.certfile.is_file() {
        let info = client.get_ca_info().await?;
        debug!(
            "Writing the root certificate of {} to {:?}",
            info.ca_name, org.ca.certfile
        );
        write_if_changed(&org.ca.certfile, &info.ca_chain_pem)?;
    }

    let bootstrap = &org.users.bootstrap_admin;
    let mut identity = Identity::bootstrap(&bootstrap.name, bootstrap.pass.clone())?;
    ctx.progress(&format!(
        "Enrolling with {} as bootstrap identity...",
        org.ca.name
    ));
    let enrollment = enroll(&client, &mut identity, None, Profile::Default).await?;
    Ok((client, identity, enrollment))
}

/// Enrolls `identity` with its own secret and records the enrollment on it.
async fn enroll(
    client: &CaClient,
    identity: &mut Identity,
    csr: Option<&Csr>,
    profile: Profile,
) -> Result<Enrollment> {
    let enrollment = client
        .enroll(identity.name(), identity.secret(), csr, profile)
        .await?;
    identity.mark_enrolled()?;
    trace!("'{}' is now {}", identity.name(), identity.state());
    Ok(enrollment)
}

fn find_identity<'a>(identities: &'a mut [Identity], name: &str) -> Result<&'a mut Identity> {
    identities
        .iter_mut()
        .find(|identity| identity.name() == name)
        .ok_or_else(|| Error::UnknownIdentity(name.to_string()))
}

/// The identities an organization registers with its CA, in registration order.
pub fn org_identities(org: &OrgConfig) -> Result<Vec<Identity>> {
    let admin = &org.users.admin;
    let mut identities = Vec::new();
    match org.kind {
        OrgKind::Peer => {
            for peer in &org.nodes {
                identities.push(Identity::new(
                    &peer.name,
                    peer.pass.clone(),
                    IdentityType::Peer,
                )?);
            }
            identities.push(
                Identity::new(&admin.name, admin.pass.clone(), IdentityType::Client)?
                    .with_attributes(admin_attributes()),
            );
            if let Some(user) = &org.users.user {
                identities.push(
                    Identity::new(&user.name, user.pass.clone(), IdentityType::User)?
                        .with_attributes(user_attributes()),
                );
            }
        }
        OrgKind::Orderer => {
            for orderer in &org.nodes {
                identities.push(Identity::new(
                    &orderer.name,
                    orderer.pass.clone(),
                    IdentityType::Orderer,
                )?);
            }
            identities.push(
                Identity::new(&admin.name, admin.pass.clone(), IdentityType::Client)?
                    .with_attributes(orderer_admin_attributes()),
            );
        }
    }
    Ok(identities)
}

/// Registers every identity of the organization. Identities the CA already knows are kept.
pub async fn register_identities(
    ctx: &NetworkContext,
    org: &OrgConfig,
    client: &CaClient,
    registrar: &Enrollment,
) -> Result<Vec<Identity>> {
    let registrar = Registrar::new(client, registrar)?;
    let mut identities = org_identities(org)?;
    for identity in &mut identities {
        match registrar.ensure_registered(identity).await? {
            RegistrationOutcome::Registered => ctx.progress(&format!(
                "Registered {} '{}' with {}",
                identity.kind(),
                identity.name(),
                org.ca.name
            )),
            RegistrationOutcome::AlreadyRegistered => {
                debug!("'{}' was already registered", identity.name())
            }
        }
    }
    Ok(identities)
}

/// Enrolls `identity` into `<home>/msp`, listing its own certificate under `admincerts`. The
/// enrollment is skipped when that trust store already holds one, but the store is always
/// completed so an interrupted run is repaired.
pub async fn configure_local_msp(
    ctx: &NetworkContext,
    org: &OrgConfig,
    client: &CaClient,
    user: &UserConfig,
    identity: &mut Identity,
) -> Result<TrustStore> {
    let trust_store = TrustStore::new(user.msp_dir());
    if trust_store.exists() {
        debug!(
            "The MSP of '{}' already exists at {:?}",
            user.name,
            trust_store.root()
        );
    } else {
        liveness::wait_for_file(&org.ca.certfile, org.ca.wait()).await?;
        ctx.progress(&format!(
            "Enrolling user '{}' for organization {} with {}...",
            user.name, org.name, org.ca.name
        ));
        let enrollment = enroll(client, identity, None, Profile::Default).await?;
        trust_store.materialize(&enrollment, true)?;
    }
    trust_store.complete_setup()?;
    Ok(trust_store)
}

/// Enrolls a TLS certificate for `node` with a fresh key and `san` as its only host name.
async fn enroll_tls(
    client: &CaClient,
    identity: &mut Identity,
    san: &str,
    layout: &TlsLayout,
) -> Result<()> {
    let key = PrivateKey::generate()?;
    let csr = CsrBuilder::new(identity.name()).host(san).build(&key)?;
    let enrollment = enroll(client, identity, Some(&csr), Profile::Tls).await?;
    layout.write(&enrollment, &key)?;
    debug!(
        "Wrote TLS material of '{}' for {san} to {:?}",
        identity.name(),
        layout.dir
    );
    Ok(())
}

/// Issues the node's server and client TLS certificates and enrolls its local MSP.
///
/// Peers list the organization admin as their admin; orderers list themselves.
pub async fn provision_node(
    ctx: &NetworkContext,
    org: &OrgConfig,
    client: &CaClient,
    node: &NodeConfig,
    identity: &mut Identity,
) -> Result<TrustStore> {
    ctx.progress(&format!("Provisioning {} of {}...", node.name, org.name));
    enroll_tls(client, identity, &node.host, &org.server_tls(node)).await?;
    enroll_tls(client, identity, &node.name, &org.client_tls(node)).await?;

    let enrollment = enroll(client, identity, None, Profile::Default).await?;
    let trust_store = TrustStore::new(org.node_msp_dir(node));
    trust_store.materialize(&enrollment, false)?;

    match org.kind {
        OrgKind::Peer => {
            let admin_cert = ctx.admin_trust_store(org).signcert_pem()?;
            trust_store.install_admin_cert(&org.users.admin.name, &admin_cert)?;
        }
        OrgKind::Orderer => {
            trust_store.install_admin_cert(&node.name, enrollment.cert_pem())?;
        }
    }
    Ok(trust_store)
}

/// Runs the whole provisioning of one organization. Returns its identities, the bootstrap
/// identity first, in the enrollment state this run left them in.
pub async fn setup_org(ctx: &NetworkContext, org: &OrgConfig) -> Result<Vec<Identity>> {
    info!("Setting up organization '{}'", org.name);
    let (client, bootstrap, registrar) = enroll_bootstrap_admin(ctx, org).await?;
    let mut identities = register_identities(ctx, org, &client, &registrar).await?;

    let admin = &org.users.admin;
    configure_local_msp(
        ctx,
        org,
        &client,
        admin,
        find_identity(&mut identities, &admin.name)?,
    )
    .await?;
    if org.kind == OrgKind::Peer {
        if let Some(user) = &org.users.user {
            configure_local_msp(
                ctx,
                org,
                &client,
                user,
                find_identity(&mut identities, &user.name)?,
            )
            .await?;
        }
    }

    for node in &org.nodes {
        provision_node(
            ctx,
            org,
            &client,
            node,
            find_identity(&mut identities, &node.name)?,
        )
        .await?;
    }
    ctx.progress(&format!("Finished setup of {}", org.name));
    identities.insert(0, bootstrap);
    Ok(identities)
}

/// Sets up the named organization, or every organization in declaration order.
pub async fn setup(ctx: &NetworkContext, only: Option<&str>) -> Result<()> {
    match only {
        Some(name) => {
            setup_org(ctx, ctx.org(name)?).await?;
            Ok(())
        }
        None => {
            for org in &ctx.config().orgs {
                setup_org(ctx, org).await?;
            }
            Ok(())
        }
    }
}
