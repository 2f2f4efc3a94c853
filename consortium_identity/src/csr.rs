// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{error::Result, key::PrivateKey};
use rcgen::{CertificateParams, DistinguishedName, DnType};
use serde::{Deserialize, Serialize};

/// The subject fields placed in a certificate request besides the common name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrNames {
    #[serde(default, rename = "C")]
    pub country: Option<String>,
    #[serde(default, rename = "ST")]
    pub state: Option<String>,
    #[serde(default, rename = "L")]
    pub locality: Option<String>,
    #[serde(default, rename = "O")]
    pub organization: Option<String>,
    #[serde(default, rename = "OU")]
    pub organizational_unit: Option<String>,
}

/// A PEM encoded PKCS#10 certificate request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Csr {
    pem: String,
}

impl Csr {
    pub fn pem(&self) -> &str {
        &self.pem
    }
}

/// Builds certificate requests for an enrollment, e.g. the TLS request of a node which must
/// carry the node's host names as SANs.
#[derive(Clone, Debug)]
pub struct CsrBuilder {
    common_name: String,
    hosts: Vec<String>,
    names: CsrNames,
}

impl CsrBuilder {
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            hosts: Vec::new(),
            names: CsrNames::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.hosts.push(host.into());
        self
    }

    pub fn hosts(mut self, hosts: impl IntoIterator<Item = String>) -> Self {
        self.hosts.extend(hosts);
        self
    }

    pub fn names(mut self, names: CsrNames) -> Self {
        self.names = names;
        self
    }

    /// Signs the request with `key`, whose public half ends up in the issued certificate.
    pub fn build(self, key: &PrivateKey) -> Result<Csr> {
        let mut params = CertificateParams::new(self.hosts)?;

        let mut dn = DistinguishedName::new();
        let subject = [
            (DnType::CountryName, self.names.country),
            (DnType::StateOrProvinceName, self.names.state),
            (DnType::LocalityName, self.names.locality),
            (DnType::OrganizationName, self.names.organization),
            (DnType::OrganizationalUnitName, self.names.organizational_unit),
        ];
        for (dn_type, value) in subject {
            if let Some(value) = value {
                dn.push(dn_type, value);
            }
        }
        dn.push(DnType::CommonName, self.common_name);
        params.distinguished_name = dn;

        let request = params.serialize_request(&key.key_pair()?)?;
        Ok(Csr {
            pem: request.pem()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_should_be_pem_encoded() -> Result<()> {
        let key = PrivateKey::generate()?;
        let csr = CsrBuilder::new("peer1")
            .host("peer1-owkin")
            .names(CsrNames {
                country: Some("FR".to_string()),
                organization: Some("owkin".to_string()),
                ..Default::default()
            })
            .build(&key)?;

        assert!(csr.pem().starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
        Ok(())
    }

    #[test]
    fn names_should_use_the_short_json_keys() -> Result<()> {
        let names: CsrNames = serde_json::from_str(r#"{"C": "FR", "ST": "Loire Atlantique"}"#)
            .map_err(crate::Error::from)?;
        assert_eq!(names.country.as_deref(), Some("FR"));
        assert_eq!(names.state.as_deref(), Some("Loire Atlantique"));
        assert!(names.locality.is_none());
        Ok(())
    }
}
