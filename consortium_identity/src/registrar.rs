// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{
    ca_client::{wire, CaClient},
    enrollment::Enrollment,
    error::{Error, Result},
    identity::{Attribute, Identity, IdentityType},
    key::PrivateKey,
};
use tracing::{debug, info};

/// What the CA is asked to register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub name: String,
    pub secret: String,
    pub kind: IdentityType,
    pub affiliation: Option<String>,
    pub attributes: Vec<Attribute>,
    /// -1 means unlimited.
    pub max_enrollments: i32,
}

impl From<&Identity> for RegistrationRequest {
    fn from(identity: &Identity) -> Self {
        Self {
            name: identity.name().to_string(),
            secret: identity.secret().expose().to_string(),
            kind: identity.kind(),
            affiliation: identity.affiliation().map(str::to_string),
            attributes: identity.attributes().to_vec(),
            max_enrollments: identity.max_enrollments(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    AlreadyRegistered,
}

/// Registers identities on behalf of an enrolled registrar.
pub struct Registrar<'a> {
    client: &'a CaClient,
    cert_pem: &'a str,
    key: &'a PrivateKey,
}

impl<'a> Registrar<'a> {
    /// The registrar enrollment must hold its private key; its rights are checked by the CA.
    pub fn new(client: &'a CaClient, registrar: &'a Enrollment) -> Result<Self> {
        let key = registrar.private_key().ok_or_else(|| {
            Error::Key(format!(
                "registrar '{}' has no private key to sign requests with",
                registrar.enrollment_id()
            ))
        })?;
        Ok(Self {
            client,
            cert_pem: registrar.cert_pem(),
            key,
        })
    }

    /// Fails with `DuplicateIdentity` if the name is already known to the CA.
    pub async fn register(&self, request: &RegistrationRequest) -> Result<()> {
        let body = wire::RegisterRequest {
            id: request.name.clone(),
            kind: request.kind.as_str().to_string(),
            secret: request.secret.clone(),
            max_enrollments: request.max_enrollments,
            affiliation: request.affiliation.clone().unwrap_or_default(),
            attrs: request.attributes.clone(),
            caname: self.client.ca_name().to_string(),
        };
        debug!(
            "Registering '{}' as {} with {} attributes",
            request.name,
            request.kind,
            request.attributes.len()
        );
        self.client.register(self.cert_pem, self.key, &body).await?;
        info!("Registered '{}'", request.name);
        Ok(())
    }

    /// Registration that treats an existing registration as success, so provisioning can be
    /// re-run against a CA that already knows the identity.
    pub async fn register_if_absent(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationOutcome> {
        match self.register(request).await {
            Ok(()) => Ok(RegistrationOutcome::Registered),
            Err(Error::DuplicateIdentity(name)) => {
                info!("'{name}' is already registered");
                Ok(RegistrationOutcome::AlreadyRegistered)
            }
            Err(err) => Err(err),
        }
    }

    /// Registers `identity` if needed and records it as registered.
    pub async fn ensure_registered(&self, identity: &mut Identity) -> Result<RegistrationOutcome> {
        let outcome = self
            .register_if_absent(&RegistrationRequest::from(&*identity))
            .await?;
        identity.mark_registered()?;
        Ok(outcome)
    }
}
