// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Anchor peer nomination rejected: {0}")]
    AnchorPeer(String),
    #[error("Channel '{0}' already exists")]
    ChannelExists(String),
    #[error("Channel '{0}' was not found")]
    ChannelNotFound(String),
    #[error("Could not connect to the ordering service at '{0}'")]
    Connection(String),
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
    #[error("Cannot compute the update: {0}")]
    Diff(String),
    #[error(transparent)]
    Encode(#[from] prost::EncodeError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Identity(#[from] consortium_identity::Error),
    #[error("Signature of '{0}' does not verify")]
    InvalidSignature(String),
    #[error("An update session cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },
    #[error("The merged configuration is identical to the current one")]
    NoOpUpdate,
    #[error("Policy '{0}' is not satisfied by the collected signatures")]
    PolicyNotSatisfied(String),
    #[error("The ordering service rejected the request: {0}")]
    Rejected(String),
    #[error("The update was computed against a stale configuration: {0}")]
    StaleConfig(String),
    #[error("Timed out after {0:?} waiting for the ordering service")]
    Timeout(Duration),
    #[error("Organization '{0}' is not part of the configuration")]
    UnknownOrganization(String),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Stable name of the error kind, used on the wire by the ordering gateway.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::AnchorPeer(_) => "anchor_peer",
            Error::ChannelExists(_) => "channel_exists",
            Error::ChannelNotFound(_) => "channel_not_found",
            Error::InvalidSignature(_) => "invalid_signature",
            Error::NoOpUpdate => "no_op_update",
            Error::PolicyNotSatisfied(_) => "policy_not_satisfied",
            Error::StaleConfig(_) => "stale_config",
            Error::UnknownOrganization(_) => "unknown_organization",
            _ => "rejected",
        }
    }

    /// The payload of the error without the kind's prefix text.
    pub fn detail(&self) -> String {
        match self {
            Error::AnchorPeer(detail)
            | Error::ChannelExists(detail)
            | Error::ChannelNotFound(detail)
            | Error::InvalidSignature(detail)
            | Error::PolicyNotSatisfied(detail)
            | Error::Rejected(detail)
            | Error::StaleConfig(detail)
            | Error::UnknownOrganization(detail) => detail.clone(),
            other => other.to_string(),
        }
    }

    /// Rebuilds an error from its wire kind and message.
    pub fn from_kind(kind: &str, message: String) -> Self {
        match kind {
            "anchor_peer" => Error::AnchorPeer(message),
            "channel_exists" => Error::ChannelExists(message),
            "channel_not_found" => Error::ChannelNotFound(message),
            "invalid_signature" => Error::InvalidSignature(message),
            "no_op_update" => Error::NoOpUpdate,
            "policy_not_satisfied" => Error::PolicyNotSatisfied(message),
            "stale_config" => Error::StaleConfig(message),
            "unknown_organization" => Error::UnknownOrganization(message),
            _ => Error::Rejected(message),
        }
    }
}
