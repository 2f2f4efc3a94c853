// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use std::{path::PathBuf, time::Duration};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    #[error("The CA returned an unexpected response: {0}")]
    CaResponse(String),
    #[error("Could not parse certificate: {0}")]
    Certificate(String),
    #[error("Could not connect to the CA at '{0}'")]
    Connection(String),
    #[error(transparent)]
    Csr(#[from] rcgen::Error),
    #[error("Identity '{0}' is already registered")]
    DuplicateIdentity(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Invalid identity definition: {0}")]
    InvalidIdentity(String),
    #[error("Identity '{name}' cannot be {action} while it is {state}")]
    InvalidStateTransition {
        name: String,
        action: &'static str,
        state: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Invalid key material: {0}")]
    Key(String),
    #[error("The trust store at {0:?} is missing '{1}'")]
    MissingTrustMaterial(PathBuf, &'static str),
    #[error("The registrar is not allowed to register '{0}': {1}")]
    Permission(String, String),
    #[error("Certificate issued for '{name}' does not fit the {profile} profile: {reason}")]
    ProfileMismatch {
        name: String,
        profile: String,
        reason: String,
    },
    #[error("Identity '{0}' has no enrollments left")]
    QuotaExceeded(String),
    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
