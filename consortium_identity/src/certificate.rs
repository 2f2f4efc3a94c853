// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Read-only inspection of PEM encoded X.509 certificates.

use crate::error::{Error, Result};
use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_ASN1};
use x509_parser::{certificate::X509Certificate, pem::parse_x509_pem};

/// The extended key usages relevant to the enrollment profiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyUsages {
    pub server_auth: bool,
    pub client_auth: bool,
    pub is_ca: bool,
}

fn with_certificate<T>(pem: &str, f: impl FnOnce(&X509Certificate<'_>) -> Result<T>) -> Result<T> {
    let (_, pem) = parse_x509_pem(pem.as_bytes())
        .map_err(|err| Error::Certificate(format!("invalid PEM: {err}")))?;
    let certificate = pem
        .parse_x509()
        .map_err(|err| Error::Certificate(format!("invalid DER: {err}")))?;
    f(&certificate)
}

/// DER bytes of the first certificate in `pem`.
pub fn to_der(pem: &str) -> Result<Vec<u8>> {
    let (_, pem) = parse_x509_pem(pem.as_bytes())
        .map_err(|err| Error::Certificate(format!("invalid PEM: {err}")))?;
    Ok(pem.contents)
}

pub fn common_name(pem: &str) -> Result<String> {
    with_certificate(pem, |cert| {
        cert.subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::Certificate("certificate has no common name".to_string()))
    })
}

pub fn key_usages(pem: &str) -> Result<KeyUsages> {
    with_certificate(pem, |cert| {
        let mut usages = KeyUsages {
            is_ca: cert.is_ca(),
            ..Default::default()
        };
        if let Some(eku) = cert
            .extended_key_usage()
            .map_err(|err| Error::Certificate(err.to_string()))?
        {
            usages.server_auth = eku.value.server_auth;
            usages.client_auth = eku.value.client_auth;
        }
        Ok(usages)
    })
}

/// Whether `pem` carries a valid signature from the key certified by `issuer_pem`.
pub fn is_issued_by(pem: &str, issuer_pem: &str) -> Result<bool> {
    with_certificate(issuer_pem, |issuer| {
        with_certificate(pem, |cert| {
            Ok(cert.issuer() == issuer.subject()
                && cert.verify_signature(Some(issuer.public_key())).is_ok())
        })
    })
}

/// Whether two PEM documents encode the same certificate, ignoring PEM formatting.
pub fn same_certificate(a: &str, b: &str) -> bool {
    match (to_der(a), to_der(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Verifies an ECDSA P-256 signature made by the key certified in `pem`.
pub fn verify_signature(pem: &str, message: &[u8], signature: &[u8]) -> Result<bool> {
    with_certificate(pem, |cert| {
        let public_key = cert.public_key().subject_public_key.data.to_vec();
        Ok(UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, public_key)
            .verify(message, signature)
            .is_ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrivateKey;
    use rcgen::{BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa};

    fn self_signed(cn: &str, key: &PrivateKey, ca: bool) -> String {
        let mut params = CertificateParams::new(vec![format!("{cn}.example.com")]).unwrap();
        params.distinguished_name.push(DnType::CommonName, cn);
        if ca {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        } else {
            params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        }
        params.self_signed(&key.key_pair().unwrap()).unwrap().pem()
    }

    #[test]
    fn inspection_should_expose_name_and_usages() -> Result<()> {
        let key = PrivateKey::generate()?;
        let pem = self_signed("peer1", &key, false);

        assert_eq!(common_name(&pem)?, "peer1");
        assert_eq!(
            key_usages(&pem)?,
            KeyUsages {
                server_auth: true,
                client_auth: false,
                is_ca: false
            }
        );
        assert!(key_usages(&self_signed("rca", &key, true))?.is_ca);
        Ok(())
    }

    #[test]
    fn signature_should_only_verify_for_the_signed_message() -> Result<()> {
        let key = PrivateKey::generate()?;
        let pem = self_signed("admin-owkin", &key, false);
        let signature = key.sign(b"config update")?;

        assert!(verify_signature(&pem, b"config update", &signature)?);
        assert!(!verify_signature(&pem, b"another update", &signature)?);
        Ok(())
    }

    #[test]
    fn self_signed_root_should_issue_itself_only() -> Result<()> {
        let root = self_signed("rca", &PrivateKey::generate()?, true);
        let other = self_signed("rca", &PrivateKey::generate()?, true);

        assert!(is_issued_by(&root, &root)?);
        assert!(!is_issued_by(&other, &root)?);
        assert!(same_certificate(&root, &format!("\n{root}")));
        assert!(!same_certificate(&root, &other));
        Ok(())
    }
}
