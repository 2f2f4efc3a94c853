// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{
    consortium_proto::{ConfigSignature, ConfigUpdateEnvelope, SerializedIdentity, SignatureHeader},
    error::{Error, Result},
};
use consortium_identity::{certificate, SigningIdentity};
use prost::Message;
use tracing::{debug, trace};

/// An identity whose signature over an update has been verified.
#[derive(Clone, Debug, PartialEq)]
pub struct Signer {
    pub msp_id: String,
    pub cert_pem: String,
}

pub fn serialized_identity(identity: &SigningIdentity) -> SerializedIdentity {
    SerializedIdentity {
        mspid: identity.msp_id().to_string(),
        id_bytes: identity.cert_pem().as_bytes().to_vec(),
    }
}

fn signed_bytes(signature_header: &[u8], update_bytes: &[u8]) -> Vec<u8> {
    [signature_header, update_bytes].concat()
}

/// Signs the serialized update on behalf of `identity`.
///
/// Signatures are independent of each other: each one covers its own header and the update bytes,
/// so they can be collected in any order and by any number of parties at once.
pub fn collect_signature(update_bytes: &[u8], identity: &SigningIdentity) -> Result<ConfigSignature> {
    let header = SignatureHeader {
        creator: serialized_identity(identity).encode_to_vec(),
        nonce: Vec::new(),
    };
    let signature_header = header.encode_to_vec();
    let signature = identity.sign(&signed_bytes(&signature_header, update_bytes))?;
    debug!(
        "Collected a signature from an identity of {}",
        identity.msp_id()
    );
    Ok(ConfigSignature {
        signature_header,
        signature,
    })
}

/// The identity claiming to have made `signature`, without checking it.
pub fn creator(signature: &ConfigSignature) -> Result<SerializedIdentity> {
    let header = SignatureHeader::decode(signature.signature_header.as_slice())?;
    Ok(SerializedIdentity::decode(header.creator.as_slice())?)
}

/// Checks one signature over `update_bytes` and returns its signer.
pub fn verify(signature: &ConfigSignature, update_bytes: &[u8]) -> Result<Signer> {
    let creator = creator(signature)?;
    let cert_pem = String::from_utf8(creator.id_bytes)
        .map_err(|_| Error::InvalidSignature(creator.mspid.clone()))?;
    let valid = SigningIdentity::verify(
        &cert_pem,
        &signed_bytes(&signature.signature_header, update_bytes),
        &signature.signature,
    )
    .unwrap_or(false);
    if !valid {
        let name = certificate::common_name(&cert_pem).unwrap_or_else(|_| creator.mspid.clone());
        return Err(Error::InvalidSignature(name));
    }
    Ok(Signer {
        msp_id: creator.mspid,
        cert_pem,
    })
}

/// Verifies every signature of the envelope. A certificate signing more than once counts once.
pub fn verify_envelope(envelope: &ConfigUpdateEnvelope) -> Result<Vec<Signer>> {
    let mut signers: Vec<Signer> = Vec::with_capacity(envelope.signatures.len());
    for signature in &envelope.signatures {
        let signer = verify(signature, &envelope.config_update)?;
        if signers
            .iter()
            .any(|known| certificate::same_certificate(&known.cert_pem, &signer.cert_pem))
        {
            trace!("Ignoring a repeated signature from {}", signer.msp_id);
            continue;
        }
        signers.push(signer);
    }
    Ok(signers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use color_eyre::eyre::Result;
    use consortium_identity::test_utils::TestOrg;

    #[test]
    fn signature_should_verify_against_the_same_bytes_only() -> Result<()> {
        let org = TestOrg::new("owkin", "owkinMSP")?;
        let admin = org.issue("admin-owkin")?;
        let update = b"serialized update".to_vec();

        let signature = collect_signature(&update, &admin)?;
        let signer = verify(&signature, &update)?;
        assert_eq!(signer.msp_id, "owkinMSP");
        assert_eq!(signer.cert_pem, admin.cert_pem());

        assert_matches!(
            verify(&signature, b"another update"),
            Err(Error::InvalidSignature(name)) if name == "admin-owkin"
        );
        Ok(())
    }

    #[test]
    fn repeated_signer_should_count_once() -> Result<()> {
        let org = TestOrg::new("owkin", "owkinMSP")?;
        let admin = org.issue("admin-owkin")?;
        let user = org.issue("user-owkin")?;
        let config_update = b"serialized update".to_vec();

        let envelope = ConfigUpdateEnvelope {
            signatures: vec![
                collect_signature(&config_update, &admin)?,
                collect_signature(&config_update, &user)?,
                collect_signature(&config_update, &admin)?,
            ],
            config_update,
        };
        let signers = verify_envelope(&envelope)?;
        assert_eq!(signers.len(), 2);
        assert_eq!(signers[0].cert_pem, admin.cert_pem());
        assert_eq!(signers[1].cert_pem, user.cert_pem());
        Ok(())
    }
}
