// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::error::{Error, Result};
use rcgen::KeyPair;
use ring::{
    rand::SystemRandom,
    signature::{EcdsaKeyPair, ECDSA_P256_SHA256_ASN1_SIGNING},
};
use std::{fmt, sync::Arc};

/// An ECDSA P-256 private key, kept both as PKCS#8 PEM (for the keystore) and as a ready to use
/// signing key.
#[derive(Clone)]
pub struct PrivateKey {
    pem: String,
    signing_key: Arc<EcdsaKeyPair>,
}

impl PrivateKey {
    pub fn generate() -> Result<Self> {
        let key_pair = KeyPair::generate()?;
        Self::from_pem(&key_pair.serialize_pem())
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        let key_pair = KeyPair::from_pem(pem)?;
        let signing_key = EcdsaKeyPair::from_pkcs8(
            &ECDSA_P256_SHA256_ASN1_SIGNING,
            &key_pair.serialize_der(),
            &SystemRandom::new(),
        )
        .map_err(|err| Error::Key(format!("not an ECDSA P-256 PKCS#8 key: {err}")))?;

        Ok(Self {
            pem: key_pair.serialize_pem(),
            signing_key: Arc::new(signing_key),
        })
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// The same key as an `rcgen` key pair, used to sign certificate requests.
    pub(crate) fn key_pair(&self) -> Result<KeyPair> {
        Ok(KeyPair::from_pem(&self.pem)?)
    }

    /// DER encoded ECDSA signature over the SHA-256 digest of `message`.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature = self
            .signing_key
            .sign(&SystemRandom::new(), message)
            .map_err(|_| Error::Key("signing failed".to_string()))?;
        Ok(signature.as_ref().to_vec())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.pem == other.pem
    }
}
