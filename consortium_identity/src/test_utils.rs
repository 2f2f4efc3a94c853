// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Test doubles: an HTTP certificate authority served by `wiremock`, and throwaway organizations
//! issuing identities without any server.

use crate::{
    auth,
    ca_client::{codes, wire, CaClient},
    certificate,
    enrollment::SigningIdentity,
    error::Result,
    identity::Attribute,
    key::PrivateKey,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CertificateSigningRequestParams,
    DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose,
};
use serde_json::json;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

/// A self-signed root able to issue certificates.
struct Issuer {
    cert: Certificate,
    key: KeyPair,
    pem: String,
}

impl Issuer {
    fn new(common_name: &str) -> Result<Self> {
        let key = KeyPair::generate()?;
        let mut params = CertificateParams::new(Vec::<String>::new())?;
        params.distinguished_name = DistinguishedName::new();
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let cert = params.self_signed(&key)?;
        let pem = cert.pem();
        Ok(Self { cert, key, pem })
    }
}

fn leaf_subject(common_name: &str, unit: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationalUnitName, unit);
    dn.push(DnType::CommonName, common_name);
    dn
}

struct Registered {
    secret: String,
    kind: String,
    attributes: Vec<Attribute>,
    max_enrollments: i32,
    enrollments: i32,
    bootstrap: bool,
}

impl Registered {
    fn may_register(&self, kind: &str) -> bool {
        self.bootstrap
            || self
                .attributes
                .iter()
                .filter(|a| a.name == "hf.Registrar.Roles")
                .flat_map(|a| a.value.split(','))
                .any(|role| role == kind || role == "*")
    }
}

struct CaState {
    name: String,
    issuer: Issuer,
    identities: Mutex<BTreeMap<String, Registered>>,
    ignore_profiles: AtomicBool,
}

impl CaState {
    fn identities(&self) -> MutexGuard<'_, BTreeMap<String, Registered>> {
        self.identities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn server_info(&self) -> serde_json::Value {
        json!({
            "CAName": self.name,
            "CAChain": STANDARD.encode(&self.issuer.pem),
            "Version": "1.5.7"
        })
    }

    fn issue(&self, name: &str, kind: &str, csr_pem: &str, profile: &str) -> Result<String> {
        let mut csr = CertificateSigningRequestParams::from_pem(csr_pem)?;
        // the enrollment id always wins over the requested subject
        csr.params.distinguished_name = leaf_subject(name, kind);
        csr.params.is_ca = IsCa::ExplicitNoCa;
        if profile == "tls" && !self.ignore_profiles.load(Ordering::SeqCst) {
            csr.params.key_usages = vec![
                KeyUsagePurpose::DigitalSignature,
                KeyUsagePurpose::KeyEncipherment,
                KeyUsagePurpose::KeyAgreement,
            ];
            csr.params.extended_key_usages = vec![
                ExtendedKeyUsagePurpose::ServerAuth,
                ExtendedKeyUsagePurpose::ClientAuth,
            ];
        } else {
            csr.params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
            csr.params.extended_key_usages = Vec::new();
        }
        Ok(csr.signed_by(&self.issuer.cert, &self.issuer.key)?.pem())
    }

    fn enroll(&self, request: &Request) -> ResponseTemplate {
        let Some((name, secret)) = basic_credentials(request) else {
            return failure(401, codes::AUTHENTICATION_FAILURE, "Authentication failure");
        };
        let mut identities = self.identities();
        let Some(identity) = identities.get_mut(&name) else {
            return failure(401, codes::AUTHENTICATION_FAILURE, "Authentication failure");
        };
        if identity.secret != secret {
            return failure(401, codes::AUTHENTICATION_FAILURE, "Authentication failure");
        }
        if identity.max_enrollments > 0 && identity.enrollments >= identity.max_enrollments {
            return failure(
                401,
                codes::MAX_ENROLLMENTS_EXCEEDED,
                "The identity has exceeded its maximum number of enrollments",
            );
        }
        let body: wire::EnrollRequest = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(err) => return failure(400, 0, &err.to_string()),
        };
        match self.issue(&name, &identity.kind, &body.certificate_request, &body.profile) {
            Ok(cert) => {
                identity.enrollments += 1;
                success(json!({
                    "Cert": STANDARD.encode(cert),
                    "ServerInfo": self.server_info(),
                }))
            }
            Err(err) => failure(400, 0, &format!("Invalid certificate request: {err}")),
        }
    }

    fn register(&self, request: &Request) -> ResponseTemplate {
        let token = request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let registrar_cert = match auth::verify_token(token, &request.body) {
            Ok(cert) => cert,
            Err(_) => return failure(401, codes::AUTHENTICATION_FAILURE, "Invalid token"),
        };
        if !certificate::is_issued_by(&registrar_cert, &self.issuer.pem).unwrap_or(false) {
            return failure(401, codes::AUTHENTICATION_FAILURE, "Untrusted certificate");
        }
        let Ok(registrar_name) = certificate::common_name(&registrar_cert) else {
            return failure(401, codes::AUTHENTICATION_FAILURE, "Untrusted certificate");
        };
        let body: wire::RegisterRequest = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(err) => return failure(400, 0, &err.to_string()),
        };

        let mut identities = self.identities();
        match identities.get(&registrar_name) {
            Some(registrar) if registrar.may_register(&body.kind) => {}
            _ => {
                return failure(
                    403,
                    codes::AUTHORIZATION_FAILURE,
                    &format!(
                        "'{registrar_name}' is not allowed to register identities of type '{}'",
                        body.kind
                    ),
                )
            }
        }
        if identities.contains_key(&body.id) {
            return failure(
                400,
                codes::IDENTITY_ALREADY_REGISTERED,
                &format!("Identity '{}' is already registered", body.id),
            );
        }
        identities.insert(
            body.id.clone(),
            Registered {
                secret: body.secret.clone(),
                kind: body.kind,
                attributes: body.attrs,
                max_enrollments: body.max_enrollments,
                enrollments: 0,
                bootstrap: false,
            },
        );
        success(json!({ "secret": body.secret }))
    }
}

fn basic_credentials(request: &Request) -> Option<(String, String)> {
    let header = request.headers.get("authorization")?.to_str().ok()?;
    let decoded = STANDARD.decode(header.strip_prefix("Basic ")?).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, secret) = decoded.split_once(':')?;
    Some((name.to_string(), secret.to_string()))
}

fn success(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "result": result,
        "errors": [],
        "messages": []
    }))
}

fn failure(status: u16, code: u32, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "success": false,
        "result": null,
        "errors": [{ "code": code, "message": message }],
        "messages": []
    }))
}

#[derive(Clone, Copy)]
enum Endpoint {
    CaInfo,
    Enroll,
    Register,
}

struct CaResponder {
    state: Arc<CaState>,
    endpoint: Endpoint,
}

impl Respond for CaResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        match self.endpoint {
            Endpoint::CaInfo => success(self.state.server_info()),
            Endpoint::Enroll => self.state.enroll(request),
            Endpoint::Register => self.state.register(request),
        }
    }
}

/// A certificate authority speaking the enrollment REST protocol, backed by `wiremock`.
pub struct FakeCa {
    server: MockServer,
    state: Arc<CaState>,
}

impl FakeCa {
    /// Starts a CA whose bootstrap identity may register any identity type.
    pub async fn start(ca_name: &str, bootstrap_name: &str, bootstrap_secret: &str) -> Result<Self> {
        let state = Arc::new(CaState {
            name: ca_name.to_string(),
            issuer: Issuer::new(ca_name)?,
            identities: Mutex::new(BTreeMap::new()),
            ignore_profiles: AtomicBool::new(false),
        });
        state.identities().insert(
            bootstrap_name.to_string(),
            Registered {
                secret: bootstrap_secret.to_string(),
                kind: "client".to_string(),
                attributes: Vec::new(),
                max_enrollments: -1,
                enrollments: 0,
                bootstrap: true,
            },
        );

        let server = MockServer::start().await;
        for (verb, route, endpoint) in [
            ("GET", "/api/v1/cainfo", Endpoint::CaInfo),
            ("POST", "/api/v1/enroll", Endpoint::Enroll),
            ("POST", "/api/v1/register", Endpoint::Register),
        ] {
            Mock::given(method(verb))
                .and(path(route))
                .respond_with(CaResponder {
                    state: Arc::clone(&state),
                    endpoint,
                })
                .mount(&server)
                .await;
        }

        Ok(Self { server, state })
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn port(&self) -> u16 {
        self.server.address().port()
    }

    pub fn ca_name(&self) -> &str {
        &self.state.name
    }

    pub fn ca_cert_pem(&self) -> &str {
        &self.state.issuer.pem
    }

    pub fn client(&self) -> Result<CaClient> {
        CaClient::new(&self.uri(), self.ca_name(), None)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.state.identities().contains_key(name)
    }

    pub fn enrollment_count(&self, name: &str) -> i32 {
        self.state
            .identities()
            .get(name)
            .map_or(0, |identity| identity.enrollments)
    }

    pub fn registered_attributes(&self, name: &str) -> Vec<Attribute> {
        self.state
            .identities()
            .get(name)
            .map(|identity| identity.attributes.clone())
            .unwrap_or_default()
    }

    pub fn set_max_enrollments(&self, name: &str, max_enrollments: i32) {
        if let Some(identity) = self.state.identities().get_mut(name) {
            identity.max_enrollments = max_enrollments;
        }
    }

    /// From now on every certificate is issued with the default profile.
    pub fn ignore_profiles(&self) {
        self.state.ignore_profiles.store(true, Ordering::SeqCst);
    }
}

/// An organization with its own root, issuing identities directly.
pub struct TestOrg {
    msp_id: String,
    issuer: Issuer,
}

impl TestOrg {
    pub fn new(name: &str, msp_id: &str) -> Result<Self> {
        Ok(Self {
            msp_id: msp_id.to_string(),
            issuer: Issuer::new(&format!("rca-{name}"))?,
        })
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn ca_cert_pem(&self) -> &str {
        &self.issuer.pem
    }

    pub fn issue(&self, common_name: &str) -> Result<SigningIdentity> {
        let key = PrivateKey::generate()?;
        let mut params = CertificateParams::new(Vec::<String>::new())?;
        params.distinguished_name = leaf_subject(common_name, "client");
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        let cert = params.signed_by(&key.key_pair()?, &self.issuer.cert, &self.issuer.key)?;
        Ok(SigningIdentity::new(&self.msp_id, cert.pem(), key))
    }
}
