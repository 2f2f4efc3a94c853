// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Client of an HTTP gateway in front of the ordering service.
//!
//! Requests and responses are prost-encoded messages. A failed request answers with a non-2xx
//! status and a `kind\ndetail` text body, where `kind` is the error kind's wire name.

use super::{Committed, OrdererActions};
use crate::{
    consortium_proto::{BroadcastResponse, Config, Envelope, JoinRequest},
    error::{Error, Result},
};
use async_trait::async_trait;
use consortium_identity::SigningIdentity;
use prost::Message;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";
pub const MSP_ID_HEADER: &str = "x-msp-id";

#[derive(Clone, Debug)]
pub struct HttpOrderer {
    base_url: Url,
    client: Client,
    request_timeout: Duration,
}

impl HttpOrderer {
    /// `tls_root_pem` is the certificate to trust when the gateway is served over TLS.
    pub fn new(url: &str, tls_root_pem: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(pem) = tls_root_pem {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem.as_bytes())?);
        }
        let base_url = if url.ends_with('/') {
            Url::parse(url)?
        } else {
            Url::parse(&format!("{url}/"))?
        };
        Ok(Self {
            base_url,
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

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authenticated(
        &self,
        request: RequestBuilder,
        requester: &SigningIdentity,
        body: &[u8],
    ) -> Result<RequestBuilder> {
        Ok(request
            .header(header::AUTHORIZATION, requester.auth_token(body)?)
            .header(MSP_ID_HEADER, requester.msp_id()))
    }

    async fn send(&self, request: RequestBuilder, subject: &str) -> Result<Vec<u8>> {
        let response = match timeout(self.request_timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) if err.is_connect() => {
                warn!(
                    "Could not connect to the ordering service at {}: {err}",
                    self.base_url
                );
                return Err(Error::Connection(self.base_url.to_string()));
            }
            Ok(Err(err)) if err.is_timeout() => return Err(Error::Timeout(self.request_timeout)),
            Ok(Err(err)) => return Err(Error::Http(err)),
            Err(_) => return Err(Error::Timeout(self.request_timeout)),
        };

        let status = response.status();
        let body = response.bytes().await?;
        if status.is_success() {
            return Ok(body.to_vec());
        }
        Err(map_gateway_error(status, &String::from_utf8_lossy(&body), subject))
    }

    async fn post_envelope(&self, url: Url, envelope: Envelope, subject: &str) -> Result<Committed> {
        let request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)
            .body(envelope.encode_to_vec());
        let response = BroadcastResponse::decode(self.send(request, subject).await?.as_slice())?;
        debug!(
            "Ordering service committed '{}' at sequence {}",
            response.channel_id, response.sequence
        );
        Ok(Committed {
            channel_id: response.channel_id,
            sequence: response.sequence,
        })
    }
}

fn map_gateway_error(status: StatusCode, body: &str, subject: &str) -> Error {
    match body.split_once('\n') {
        Some((kind, detail)) => Error::from_kind(kind.trim(), detail.trim().to_string()),
        None if status == StatusCode::NOT_FOUND => Error::ChannelNotFound(subject.to_string()),
        None => Error::Rejected(format!("{status}: {}", body.trim())),
    }
}

#[async_trait]
impl OrdererActions for HttpOrderer {
    async fn fetch_config(&self, channel_id: &str, requester: &SigningIdentity) -> Result<Config> {
        let request = self
            .client
            .get(self.endpoint(&format!("channels/{channel_id}/config"))?);
        let request = self.authenticated(request, requester, &[])?;
        let body = self.send(request, channel_id).await?;
        Ok(Config::decode(body.as_slice())?)
    }

    async fn broadcast_config_update(&self, envelope: Envelope) -> Result<Committed> {
        let channel_id = crate::envelope::open(&envelope)?.channel_id;
        let url = self.endpoint(&format!("channels/{channel_id}/updates"))?;
        self.post_envelope(url, envelope, &channel_id).await
    }

    async fn create_channel(&self, envelope: Envelope) -> Result<Committed> {
        let channel_id = crate::envelope::open(&envelope)?.channel_id;
        let url = self.endpoint("channels")?;
        self.post_envelope(url, envelope, &channel_id).await
    }

    async fn join_channel(
        &self,
        channel_id: &str,
        peer: &str,
        requester: &SigningIdentity,
    ) -> Result<()> {
        let body = JoinRequest {
            peer: peer.to_string(),
        }
        .encode_to_vec();
        let request = self
            .client
            .post(self.endpoint(&format!("channels/{channel_id}/peers"))?)
            .header(header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE);
        let request = self.authenticated(request, requester, &body)?.body(body);
        self.send(request, channel_id).await?;
        Ok(())
    }
}
