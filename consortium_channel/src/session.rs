// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! The life of one update: drafted, signed by some of the required parties, submitted, and
//! finally committed or rejected.

use crate::{
    consortium_proto::ConfigSignature,
    envelope,
    error::{Error, Result},
    orderer::{Committed, OrdererActions},
    proposal::UpdateProposal,
    signature::{self, collect_signature},
};
use consortium_identity::SigningIdentity;
use std::fmt;
use tracing::{error, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Drafted,
    Signed { collected: usize, required: usize },
    Submitted,
    Committed { sequence: u64 },
    Rejected { reason: String },
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Drafted => write!(f, "drafted"),
            SessionState::Signed {
                collected,
                required,
            } => write!(f, "signed ({collected} of {required})"),
            SessionState::Submitted => write!(f, "submitted"),
            SessionState::Committed { sequence } => write!(f, "committed at sequence {sequence}"),
            SessionState::Rejected { reason } => write!(f, "rejected ({reason})"),
        }
    }
}

/// Collects the signatures of one proposal and submits it once.
#[derive(Debug)]
pub struct UpdateSession {
    proposal: UpdateProposal,
    required: usize,
    signatures: Vec<ConfigSignature>,
    state: SessionState,
}

impl UpdateSession {
    /// `required` is the number of parties expected to sign.
    pub fn new(proposal: UpdateProposal, required: usize) -> Self {
        Self {
            proposal,
            required,
            signatures: Vec::new(),
            state: SessionState::Drafted,
        }
    }

    pub fn proposal(&self) -> &UpdateProposal {
        &self.proposal
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Signatures in the order they were added.
    pub fn signatures(&self) -> &[ConfigSignature] {
        &self.signatures
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.state.to_string(),
        }
    }

    /// Adds a signature collected elsewhere over the proposal's bytes.
    ///
    /// A second signature by the same certificate is ignored.
    pub fn add_signature(&mut self, signature: ConfigSignature) -> Result<()> {
        if !matches!(
            self.state,
            SessionState::Drafted | SessionState::Signed { .. }
        ) {
            return Err(self.invalid("add a signature"));
        }
        let signer = signature::verify(&signature, self.proposal.update_bytes())?;
        let already_signed = self.signatures.iter().any(|known| {
            signature::creator(known)
                .map(|creator| creator.id_bytes == signer.cert_pem.as_bytes())
                .unwrap_or(false)
        });
        if !already_signed {
            self.signatures.push(signature);
        }
        self.state = SessionState::Signed {
            collected: self.signatures.len(),
            required: self.required,
        };
        Ok(())
    }

    /// Signs the proposal with `identity`.
    pub fn sign(&mut self, identity: &SigningIdentity) -> Result<()> {
        let signature = collect_signature(self.proposal.update_bytes(), identity)?;
        self.add_signature(signature)
    }

    /// Adds every signature of another session over the same proposal, keeping their order.
    pub fn merge(&mut self, other: &UpdateSession) -> Result<()> {
        if other.proposal.update_bytes() != self.proposal.update_bytes() {
            return Err(Error::InvalidSignature(
                "signatures over a different proposal".to_string(),
            ));
        }
        for signature in &other.signatures {
            self.add_signature(signature.clone())?;
        }
        Ok(())
    }

    /// Submits the signed proposal through `submitter`. The outcome is final: a rejected session
    /// cannot be resubmitted and a stale one must be rebuilt from a fresh configuration.
    pub async fn submit(
        &mut self,
        orderer: &dyn OrdererActions,
        submitter: &SigningIdentity,
    ) -> Result<Committed> {
        if !matches!(self.state, SessionState::Signed { .. }) {
            return Err(self.invalid("submit"));
        }
        self.state = SessionState::Submitted;
        match submit(
            orderer,
            self.proposal.channel_id(),
            self.proposal.update_bytes(),
            self.signatures.clone(),
            submitter,
        )
        .await
        {
            Ok(committed) => {
                self.state = SessionState::Committed {
                    sequence: committed.sequence,
                };
                Ok(committed)
            }
            Err(err) => {
                self.state = SessionState::Rejected {
                    reason: err.kind().to_string(),
                };
                Err(err)
            }
        }
    }
}

/// Seals the update bytes with their signatures and broadcasts them.
pub async fn submit(
    orderer: &dyn OrdererActions,
    channel_id: &str,
    update_bytes: &[u8],
    signatures: Vec<ConfigSignature>,
    submitter: &SigningIdentity,
) -> Result<Committed> {
    let count = signatures.len();
    let envelope = envelope::seal(channel_id, update_bytes, signatures, submitter)?;
    match orderer.broadcast_config_update(envelope).await {
        Ok(committed) => {
            info!(
                "Update of '{channel_id}' with {count} signature(s) committed at sequence {}",
                committed.sequence
            );
            Ok(committed)
        }
        Err(err) => {
            error!("Update of '{channel_id}' was rejected: {err}");
            Err(err)
        }
    }
}
