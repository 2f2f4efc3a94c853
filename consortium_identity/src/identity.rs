// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The identity types understood by the CA.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    Admin,
    Client,
    Orderer,
    Peer,
    User,
}

impl IdentityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityType::Admin => "admin",
            IdentityType::Client => "client",
            IdentityType::Orderer => "orderer",
            IdentityType::Peer => "peer",
            IdentityType::User => "user",
        }
    }
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(IdentityType::Admin),
            "client" => Ok(IdentityType::Client),
            "orderer" => Ok(IdentityType::Orderer),
            "peer" => Ok(IdentityType::Peer),
            "user" => Ok(IdentityType::User),
            other => Err(Error::InvalidIdentity(format!(
                "unknown identity type '{other}'"
            ))),
        }
    }
}

/// A registration attribute. With `ecert` set the CA embeds it in enrollment certificates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub ecert: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ecert: false,
        }
    }

    pub fn in_ecert(mut self) -> Self {
        self.ecert = true;
        self
    }
}

/// Attributes of a peer organization's admin: it may register clients, revoke and generate CRLs.
pub fn admin_attributes() -> Vec<Attribute> {
    vec![
        Attribute::new("hf.Registrar.Roles", "client"),
        Attribute::new("hf.Registrar.Attributes", "*"),
        Attribute::new("hf.Revoker", "true"),
        Attribute::new("hf.GenCRL", "true"),
        Attribute::new("admin", "true").in_ecert(),
        Attribute::new("abac.init", "true").in_ecert(),
    ]
}

/// The admin of an ordering organization only carries the admin marker.
pub fn orderer_admin_attributes() -> Vec<Attribute> {
    vec![Attribute::new("admin", "true").in_ecert()]
}

/// Attributes given to plain users of an organization.
pub fn user_attributes() -> Vec<Attribute> {
    vec![
        Attribute::new("hf.Revoker", "false"),
        Attribute::new("hf.Registrar.Roles", ""),
        Attribute::new("abac.init", "true").in_ecert(),
    ]
}

/// An enrollment secret. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Where an identity stands with its CA. Enrollment can be repeated while the CA's quota allows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnrollmentState {
    Unregistered,
    Registered,
    Enrolled { count: u32 },
}

impl fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentState::Unregistered => write!(f, "unregistered"),
            EnrollmentState::Registered => write!(f, "registered"),
            EnrollmentState::Enrolled { count } => write!(f, "enrolled ({count} times)"),
        }
    }
}

/// A named principal known to a CA.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    name: String,
    secret: Secret,
    kind: IdentityType,
    affiliation: Option<String>,
    attributes: Vec<Attribute>,
    max_enrollments: i32,
    state: EnrollmentState,
}

impl Identity {
    /// A bootstrap identity is registered with the CA out of band, at CA start-up.
    pub fn bootstrap(name: impl Into<String>, secret: Secret) -> Result<Self> {
        let mut identity = Self::new(name, secret, IdentityType::Client)?;
        identity.state = EnrollmentState::Registered;
        Ok(identity)
    }

    pub fn new(name: impl Into<String>, secret: Secret, kind: IdentityType) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.contains(':') {
            return Err(Error::InvalidIdentity(format!(
                "'{name}' is not a valid enrollment id"
            )));
        }
        if secret.expose().is_empty() {
            return Err(Error::InvalidIdentity(format!(
                "'{name}' has an empty secret"
            )));
        }
        Ok(Self {
            name,
            secret,
            kind,
            affiliation: None,
            attributes: Vec::new(),
            // unlimited
            max_enrollments: -1,
            state: EnrollmentState::Unregistered,
        })
    }

    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_max_enrollments(mut self, max_enrollments: i32) -> Self {
        self.max_enrollments = max_enrollments;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn kind(&self) -> IdentityType {
        self.kind
    }

    pub fn affiliation(&self) -> Option<&str> {
        self.affiliation.as_deref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn max_enrollments(&self) -> i32 {
        self.max_enrollments
    }

    pub fn state(&self) -> EnrollmentState {
        self.state
    }

    /// Registration happens once. A duplicate registration reported by the CA also lands here.
    pub fn mark_registered(&mut self) -> Result<()> {
        match self.state {
            EnrollmentState::Unregistered => {
                self.state = EnrollmentState::Registered;
                Ok(())
            }
            state => Err(self.invalid_transition("registered", state)),
        }
    }

    pub fn mark_enrolled(&mut self) -> Result<()> {
        self.state = match self.state {
            EnrollmentState::Registered => EnrollmentState::Enrolled { count: 1 },
            EnrollmentState::Enrolled { count } => EnrollmentState::Enrolled {
                count: count.saturating_add(1),
            },
            state => return Err(self.invalid_transition("enrolled", state)),
        };
        Ok(())
    }

    fn invalid_transition(&self, action: &'static str, state: EnrollmentState) -> Error {
        Error::InvalidStateTransition {
            name: self.name.clone(),
            action,
            state: state.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn identity_should_move_through_registration_then_enrollment() -> Result<()> {
        let mut peer = Identity::new("peer1", Secret::new("peer1pw"), IdentityType::Peer)?;
        assert_eq!(peer.state(), EnrollmentState::Unregistered);
        assert_matches!(
            peer.mark_enrolled(),
            Err(Error::InvalidStateTransition { .. })
        );

        peer.mark_registered()?;
        peer.mark_enrolled()?;
        peer.mark_enrolled()?;
        assert_eq!(peer.state(), EnrollmentState::Enrolled { count: 2 });
        assert_matches!(
            peer.mark_registered(),
            Err(Error::InvalidStateTransition { .. })
        );
        Ok(())
    }

    #[test]
    fn bootstrap_identity_should_start_registered() -> Result<()> {
        let admin = Identity::bootstrap("admin", Secret::new("adminpw"))?;
        assert_eq!(admin.state(), EnrollmentState::Registered);
        Ok(())
    }

    #[test]
    fn invalid_names_and_secrets_should_be_rejected() {
        assert_matches!(
            Identity::new("", Secret::new("pw"), IdentityType::User),
            Err(Error::InvalidIdentity(_))
        );
        assert_matches!(
            Identity::new("a:b", Secret::new("pw"), IdentityType::User),
            Err(Error::InvalidIdentity(_))
        );
        assert_matches!(
            Identity::new("user-owkin", Secret::new(""), IdentityType::User),
            Err(Error::InvalidIdentity(_))
        );
    }

    #[test]
    fn secret_should_be_redacted_in_debug_output() -> Result<()> {
        let identity = Identity::new("user-owkin", Secret::new("hunter2"), IdentityType::User)?;
        assert!(!format!("{identity:?}").contains("hunter2"));
        Ok(())
    }

    #[test]
    fn identity_type_should_round_trip_through_its_wire_name() -> Result<()> {
        for kind in [IdentityType::Peer, IdentityType::Orderer, IdentityType::Admin] {
            assert_eq!(kind.as_str().parse::<IdentityType>()?, kind);
        }
        assert!("validator".parse::<IdentityType>().is_err());
        Ok(())
    }
}
