// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{
    auth, certificate,
    error::{Error, Result},
    key::PrivateKey,
};

/// The material returned by a successful enrollment.
///
/// The private key is only present when it was generated locally. When the caller supplied its
/// own CSR the key never left the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct Enrollment {
    enrollment_id: String,
    cert_pem: String,
    ca_cert_pem: String,
    private_key: Option<PrivateKey>,
}

impl Enrollment {
    pub fn new(
        enrollment_id: impl Into<String>,
        cert_pem: impl Into<String>,
        ca_cert_pem: impl Into<String>,
        private_key: Option<PrivateKey>,
    ) -> Self {
        Self {
            enrollment_id: enrollment_id.into(),
            cert_pem: cert_pem.into(),
            ca_cert_pem: ca_cert_pem.into(),
            private_key,
        }
    }

    pub fn enrollment_id(&self) -> &str {
        &self.enrollment_id
    }

    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    pub fn ca_cert_pem(&self) -> &str {
        &self.ca_cert_pem
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    /// Binds this enrollment to an MSP so it can sign on behalf of the organization.
    pub fn signing_identity(&self, msp_id: impl Into<String>) -> Result<SigningIdentity> {
        let key = self.private_key.clone().ok_or_else(|| {
            Error::Key(format!(
                "enrollment of '{}' has no local private key",
                self.enrollment_id
            ))
        })?;
        Ok(SigningIdentity::new(msp_id, self.cert_pem.clone(), key))
    }
}

/// A certificate, its private key and the MSP the certificate belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct SigningIdentity {
    msp_id: String,
    cert_pem: String,
    key: PrivateKey,
}

impl SigningIdentity {
    pub fn new(msp_id: impl Into<String>, cert_pem: impl Into<String>, key: PrivateKey) -> Self {
        Self {
            msp_id: msp_id.into(),
            cert_pem: cert_pem.into(),
            key,
        }
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    pub fn name(&self) -> Result<String> {
        certificate::common_name(&self.cert_pem)
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.key.sign(message)
    }

    /// A token authenticating a request carrying `body` as this identity.
    pub fn auth_token(&self, body: &[u8]) -> Result<String> {
        auth::token(&self.cert_pem, &self.key, body)
    }

    /// Checks a signature claimed to be made by the holder of `cert_pem`.
    pub fn verify(cert_pem: &str, message: &[u8], signature: &[u8]) -> Result<bool> {
        certificate::verify_signature(cert_pem, message, signature)
    }
}
