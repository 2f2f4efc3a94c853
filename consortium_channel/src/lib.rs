// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Channel configuration updates.
//!
//! A configuration is a versioned tree of groups, values and policies. Changing it means diffing
//! two snapshots into a [`ConfigUpdate`], collecting signatures from the organizations the
//! modification policies name, and submitting the signed envelope to an ordering service, which
//! validates the update against its current configuration before committing it.

#[allow(clippy::all, missing_docs)]
pub mod consortium_proto {
    include!(concat!(env!("OUT_DIR"), "/consortium_proto.rs"));
}

pub mod apply;
pub mod config;
pub mod diff;
pub mod envelope;
pub mod error;
pub mod orderer;
pub mod organization;
pub mod policy;
pub mod proposal;
pub mod session;
pub mod signature;

pub use consortium_proto::{Config, ConfigGroup, ConfigUpdate, ConfigUpdateEnvelope, Envelope};
pub use diff::compute_update;
pub use error::{Error, Result};
pub use orderer::{http::HttpOrderer, local::LocalOrderer, Committed, OrdererActions};
pub use organization::OrgDefinition;
pub use proposal::{build_update_proposal, UpdateProposal};
pub use session::{SessionState, UpdateSession};
pub use signature::{collect_signature, Signer};
