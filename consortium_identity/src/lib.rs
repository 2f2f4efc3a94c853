// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Identities of a permissioned network: registration and enrollment against a certificate
//! authority, and the membership directories ("trust stores") the enrolled material lives in.

pub mod auth;
pub mod ca_client;
pub mod certificate;
pub mod csr;
pub mod enrollment;
pub mod error;
pub mod identity;
pub mod key;
pub mod liveness;
pub mod registrar;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod trust_store;

pub use ca_client::{CaClient, CaInfo, Profile};
pub use csr::{Csr, CsrBuilder, CsrNames};
pub use enrollment::{Enrollment, SigningIdentity};
pub use error::{Error, Result};
pub use identity::{Attribute, EnrollmentState, Identity, IdentityType, Secret};
pub use key::PrivateKey;
pub use registrar::{Registrar, RegistrationOutcome, RegistrationRequest};
pub use trust_store::{TlsLayout, TrustStore};

#[cfg(test)]
mod tests;
