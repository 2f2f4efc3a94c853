// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Token authentication of requests made with an enrolled identity.
//!
//! A token is `b64(cert).b64(sig)` where `sig` signs `b64(body).b64(cert)`.

use crate::{
    certificate,
    error::{Error, Result},
    key::PrivateKey,
};
use base64::{engine::general_purpose::STANDARD, Engine};

pub fn token(cert_pem: &str, key: &PrivateKey, body: &[u8]) -> Result<String> {
    let cert = STANDARD.encode(cert_pem);
    let signature = key.sign(signed_content(body, &cert).as_bytes())?;
    Ok(format!("{cert}.{}", STANDARD.encode(signature)))
}

/// Returns the PEM certificate of the signer if the token is valid for `body`.
///
/// Only the signature is checked here; whether the certificate is trusted is up to the caller.
pub fn verify_token(token: &str, body: &[u8]) -> Result<String> {
    let (cert, signature) = token
        .split_once('.')
        .ok_or_else(|| Error::Auth("malformed authorization token".to_string()))?;
    let cert_pem = String::from_utf8(STANDARD.decode(cert)?)
        .map_err(|_| Error::Auth("token certificate is not UTF-8".to_string()))?;
    let signature = STANDARD.decode(signature)?;

    if certificate::verify_signature(&cert_pem, signed_content(body, cert).as_bytes(), &signature)? {
        Ok(cert_pem)
    } else {
        Err(Error::Auth("token signature does not match".to_string()))
    }
}

fn signed_content(body: &[u8], encoded_cert: &str) -> String {
    format!("{}.{encoded_cert}", STANDARD.encode(body))
}
