// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{
    auth, certificate,
    csr::{Csr, CsrBuilder},
    enrollment::Enrollment,
    error::{Error, Result},
    identity::Secret,
    key::PrivateKey,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fmt, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error codes carried in the `errors` array of a CA response.
pub mod codes {
    pub const AUTHENTICATION_FAILURE: u32 = 20;
    pub const MAX_ENROLLMENTS_EXCEEDED: u32 = 22;
    pub const AUTHORIZATION_FAILURE: u32 = 71;
    pub const IDENTITY_ALREADY_REGISTERED: u32 = 74;
}

/// The signing profile requested at enrollment. `Tls` asks for a certificate usable as a TLS
/// server and client certificate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Default,
    Tls,
}

impl Profile {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Profile::Default => "",
            Profile::Tls => "tls",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Default => write!(f, "default"),
            Profile::Tls => write!(f, "tls"),
        }
    }
}

/// Request and response bodies of the CA's REST API.
pub(crate) mod wire {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub(crate) struct EnrollRequest {
        pub(crate) certificate_request: String,
        #[serde(default)]
        pub(crate) profile: String,
        #[serde(default)]
        pub(crate) caname: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(crate) struct EnrollResult {
        #[serde(rename = "Cert")]
        pub(crate) cert: String,
        #[serde(rename = "ServerInfo")]
        pub(crate) server_info: CaInfoResult,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(crate) struct CaInfoResult {
        #[serde(rename = "CAName")]
        pub(crate) ca_name: String,
        #[serde(rename = "CAChain")]
        pub(crate) ca_chain: String,
        #[serde(rename = "Version", default)]
        pub(crate) version: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(crate) struct RegisterRequest {
        pub(crate) id: String,
        #[serde(rename = "type")]
        pub(crate) kind: String,
        pub(crate) secret: String,
        pub(crate) max_enrollments: i32,
        #[serde(default)]
        pub(crate) affiliation: String,
        #[serde(default)]
        pub(crate) attrs: Vec<crate::identity::Attribute>,
        #[serde(default)]
        pub(crate) caname: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(crate) struct RegisterResult {
        pub(crate) secret: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(crate) struct CaMessage {
        pub(crate) code: u32,
        pub(crate) message: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(crate) struct CaResponse<T> {
        pub(crate) success: bool,
        pub(crate) result: Option<T>,
        #[serde(default)]
        pub(crate) errors: Vec<CaMessage>,
    }
}

/// What the CA tells about itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaInfo {
    pub ca_name: String,
    pub ca_chain_pem: String,
    pub version: String,
}

/// A client of a single CA instance.
#[derive(Clone, Debug)]
pub struct CaClient {
    base_url: Url,
    ca_name: String,
    client: Client,
    request_timeout: Duration,
}

impl CaClient {
    /// `tls_root_pem` is the CA certificate to trust when the CA is served over TLS.
    pub fn new(url: &str, ca_name: impl Into<String>, tls_root_pem: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(pem) = tls_root_pem {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem.as_bytes())?);
        }
        // joined endpoints must extend the path rather than replace its last segment
        let base_url = if url.ends_with('/') {
            Url::parse(url)?
        } else {
            Url::parse(&format!("{url}/"))?
        };
        Ok(Self {
            base_url,
            ca_name: ca_name.into(),
            client: builder.build()?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.base_url
    }

    pub fn ca_name(&self) -> &str {
        &self.ca_name
    }

    pub async fn get_ca_info(&self) -> Result<CaInfo> {
        let request = self.client.get(self.endpoint("cainfo")?);
        let result: wire::CaInfoResult = self.send(request, "cainfo").await?;
        Ok(CaInfo {
            ca_name: result.ca_name,
            ca_chain_pem: decode_pem(&result.ca_chain)?,
            version: result.version,
        })
    }

    /// Enrolls `name` with its secret.
    ///
    /// Without a `csr` a P-256 key is generated here and returned inside the enrollment. The
    /// issued certificate is checked against `profile` and must carry `name` as common name.
    pub async fn enroll(
        &self,
        name: &str,
        secret: &Secret,
        csr: Option<&Csr>,
        profile: Profile,
    ) -> Result<Enrollment> {
        let (csr, private_key) = match csr {
            Some(csr) => (csr.clone(), None),
            None => {
                let key = PrivateKey::generate()?;
                (CsrBuilder::new(name).build(&key)?, Some(key))
            }
        };

        let body = wire::EnrollRequest {
            certificate_request: csr.pem().to_string(),
            profile: profile.wire_name().to_string(),
            caname: self.ca_name.clone(),
        };
        let request = self
            .client
            .post(self.endpoint("enroll")?)
            .basic_auth(name, Some(secret.expose()))
            .json(&body);

        info!("Enrolling '{name}' with the {profile} profile at {}", self.base_url);
        let result: wire::EnrollResult = self.send(request, name).await?;

        let cert_pem = decode_pem(&result.cert)?;
        let ca_cert_pem = decode_pem(&result.server_info.ca_chain)?;
        validate_issued(name, &cert_pem, profile)?;
        debug!("Enrolled '{name}' with CA '{}'", result.server_info.ca_name);

        Ok(Enrollment::new(name, cert_pem, ca_cert_pem, private_key))
    }

    /// Sends a registration authenticated with the registrar's certificate and key.
    pub(crate) async fn register(
        &self,
        registrar_cert_pem: &str,
        registrar_key: &PrivateKey,
        body: &wire::RegisterRequest,
    ) -> Result<()> {
        let body_bytes = serde_json::to_vec(body)?;
        let token = auth::token(registrar_cert_pem, registrar_key, &body_bytes)?;
        let request = self
            .client
            .post(self.endpoint("register")?)
            .header(reqwest::header::AUTHORIZATION, token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body_bytes);

        let _: wire::RegisterResult = self.send(request, &body.id).await?;
        Ok(())
    }

    fn endpoint(&self, operation: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!("api/v1/{operation}"))?)
    }

    /// Sends the request and unwraps the CA envelope, mapping CA errors about `subject`.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, subject: &str) -> Result<T> {
        let response = match timeout(self.request_timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) if err.is_connect() => {
                warn!("Could not connect to the CA at {}: {err}", self.base_url);
                return Err(Error::Connection(self.base_url.to_string()));
            }
            Ok(Err(err)) if err.is_timeout() => {
                return Err(Error::Timeout(self.request_timeout, self.base_url.to_string()))
            }
            Ok(Err(err)) => return Err(Error::Http(err)),
            Err(_) => {
                return Err(Error::Timeout(self.request_timeout, self.base_url.to_string()))
            }
        };

        let status = response.status();
        let text = response.text().await?;
        let envelope: wire::CaResponse<T> = serde_json::from_str(&text).map_err(|_| {
            Error::CaResponse(format!("{status} with a body that is not a CA response: {text}"))
        })?;

        match envelope.result {
            Some(result) if envelope.success && status.is_success() => Ok(result),
            _ => Err(map_ca_error(status, &envelope.errors, subject)),
        }
    }
}

fn map_ca_error(status: StatusCode, errors: &[wire::CaMessage], subject: &str) -> Error {
    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let has_code = |code| errors.iter().any(|e| e.code == code);

    if has_code(codes::IDENTITY_ALREADY_REGISTERED) {
        Error::DuplicateIdentity(subject.to_string())
    } else if has_code(codes::MAX_ENROLLMENTS_EXCEEDED) {
        Error::QuotaExceeded(subject.to_string())
    } else if has_code(codes::AUTHORIZATION_FAILURE) || status == StatusCode::FORBIDDEN {
        Error::Permission(subject.to_string(), message)
    } else if has_code(codes::AUTHENTICATION_FAILURE) || status == StatusCode::UNAUTHORIZED {
        Error::Auth(format!("the CA rejected the credentials of '{subject}'"))
    } else {
        Error::CaResponse(format!("{status}: {message}"))
    }
}

/// The CA sends certificates as base64 of their PEM text.
fn decode_pem(encoded: &str) -> Result<String> {
    String::from_utf8(STANDARD.decode(encoded)?)
        .map_err(|_| Error::CaResponse("certificate is not valid UTF-8 PEM".to_string()))
}

fn validate_issued(name: &str, cert_pem: &str, profile: Profile) -> Result<()> {
    let mismatch = |reason: String| Error::ProfileMismatch {
        name: name.to_string(),
        profile: profile.to_string(),
        reason,
    };

    let common_name = certificate::common_name(cert_pem)?;
    if common_name != name {
        return Err(mismatch(format!("issued to '{common_name}'")));
    }

    let usages = certificate::key_usages(cert_pem)?;
    if usages.is_ca {
        return Err(mismatch("issued a CA certificate".to_string()));
    }
    match profile {
        Profile::Tls if !(usages.server_auth && usages.client_auth) => Err(mismatch(
            "missing the serverAuth/clientAuth extended key usages".to_string(),
        )),
        Profile::Default if usages.server_auth => Err(mismatch(
            "an enrollment certificate must not be a TLS server certificate".to_string(),
        )),
        _ => Ok(()),
    }
}
