// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! The signed envelope carrying a multi-signed update to the ordering service.

use crate::{
    consortium_proto::{
        ChannelHeader, ConfigSignature, ConfigUpdate, ConfigUpdateEnvelope, Envelope, Header,
        HeaderType, Payload, SignatureHeader,
    },
    error::{Error, Result},
    signature::{self, serialized_identity, Signer},
};
use consortium_identity::SigningIdentity;
use prost::Message;

/// Wraps the update bytes and their signatures, signed by the submitting identity.
pub fn seal(
    channel_id: &str,
    update_bytes: &[u8],
    signatures: Vec<ConfigSignature>,
    submitter: &SigningIdentity,
) -> Result<Envelope> {
    let channel_header = ChannelHeader {
        header_type: HeaderType::ConfigUpdate as i32,
        channel_id: channel_id.to_string(),
    };
    let signature_header = SignatureHeader {
        creator: serialized_identity(submitter).encode_to_vec(),
        nonce: Vec::new(),
    };
    let payload = Payload {
        header: Some(Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: signature_header.encode_to_vec(),
        }),
        data: ConfigUpdateEnvelope {
            config_update: update_bytes.to_vec(),
            signatures,
        }
        .encode_to_vec(),
    }
    .encode_to_vec();
    let signature = submitter.sign(&payload)?;
    Ok(Envelope { payload, signature })
}

/// The verified content of a config update envelope.
#[derive(Clone, Debug)]
pub struct OpenedUpdate {
    pub channel_id: String,
    pub submitter: Signer,
    pub update_envelope: ConfigUpdateEnvelope,
    pub update: ConfigUpdate,
}

/// Checks the submitter's signature and decodes the update the envelope carries.
pub fn open(envelope: &Envelope) -> Result<OpenedUpdate> {
    let payload = Payload::decode(envelope.payload.as_slice())?;
    let header = payload
        .header
        .ok_or_else(|| Error::Rejected("the envelope has no header".to_string()))?;
    let channel_header = ChannelHeader::decode(header.channel_header.as_slice())?;
    if HeaderType::from_i32(channel_header.header_type) != Some(HeaderType::ConfigUpdate) {
        return Err(Error::Rejected(format!(
            "expected a config update envelope, got header type {}",
            channel_header.header_type
        )));
    }

    let creator = signature::creator(&ConfigSignature {
        signature_header: header.signature_header,
        signature: Vec::new(),
    })?;
    let cert_pem = String::from_utf8(creator.id_bytes)
        .map_err(|_| Error::InvalidSignature(creator.mspid.clone()))?;
    // the submitter signs the whole payload
    if !SigningIdentity::verify(&cert_pem, &envelope.payload, &envelope.signature).unwrap_or(false)
    {
        return Err(Error::InvalidSignature(creator.mspid));
    }

    let update_envelope = ConfigUpdateEnvelope::decode(payload.data.as_slice())?;
    let update = ConfigUpdate::decode(update_envelope.config_update.as_slice())?;
    if update.channel_id != channel_header.channel_id {
        return Err(Error::Rejected(format!(
            "the update targets '{}' but the envelope is addressed to '{}'",
            update.channel_id, channel_header.channel_id
        )));
    }
    Ok(OpenedUpdate {
        channel_id: channel_header.channel_id,
        submitter: Signer {
            msp_id: creator.mspid,
            cert_pem,
        },
        update_envelope,
        update,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::collect_signature;
    use assert_matches::assert_matches;
    use color_eyre::eyre::Result;
    use consortium_identity::test_utils::TestOrg;

    fn update_bytes(channel_id: &str) -> Vec<u8> {
        ConfigUpdate {
            channel_id: channel_id.to_string(),
            ..Default::default()
        }
        .encode_to_vec()
    }

    #[test]
    fn sealed_envelope_should_open_with_its_signatures() -> Result<()> {
        let org = TestOrg::new("a", "AMSP")?;
        let admin = org.issue("admin-a")?;
        let bytes = update_bytes("mychannel");
        let signatures = vec![collect_signature(&bytes, &admin)?];

        let opened = open(&seal("mychannel", &bytes, signatures.clone(), &admin)?)?;
        assert_eq!(opened.channel_id, "mychannel");
        assert_eq!(opened.submitter.cert_pem, admin.cert_pem());
        assert_eq!(opened.update_envelope.signatures, signatures);
        assert_eq!(opened.update.channel_id, "mychannel");
        Ok(())
    }

    #[test]
    fn tampered_payload_should_not_open() -> Result<()> {
        let admin = TestOrg::new("a", "AMSP")?.issue("admin-a")?;
        let mut envelope = seal("mychannel", &update_bytes("mychannel"), Vec::new(), &admin)?;
        envelope.payload.push(0);
        assert_matches!(open(&envelope), Err(_));

        let misaddressed = seal("otherchannel", &update_bytes("mychannel"), Vec::new(), &admin)?;
        assert_matches!(open(&misaddressed), Err(Error::Rejected(_)));
        Ok(())
    }
}
