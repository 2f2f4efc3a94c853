// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Channel(#[from] consortium_channel::Error),
    #[error("Could not read the network configuration at {0:?}: {1}")]
    ConfigRead(PathBuf, std::io::Error),
    #[error(transparent)]
    Identity(#[from] consortium_identity::Error),
    #[error("The network configuration is invalid: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("The network has no orderer organization")]
    NoOrdererOrg,
    #[error("The network has no peer organization")]
    NoPeerOrg,
    #[error("No ordering service is configured")]
    NoOrderingService,
    #[error("No organization is listed to sign the update of '{0}'")]
    NoSigners(String),
    #[error("Channel '{channel}' kept moving: the update went stale {attempts} times")]
    StaleRetriesExhausted { channel: String, attempts: u32 },
    #[error("'{0}' is not among the identities registered for its organization")]
    UnknownIdentity(String),
    #[error("Organization '{0}' is not described in the network configuration")]
    UnknownOrg(String),
}
