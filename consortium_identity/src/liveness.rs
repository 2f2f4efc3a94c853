// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Bounded waits for services started by somebody else, such as a CA writing its root certificate
//! and opening its port.

use crate::error::{Error, Result};
use std::{
    path::Path,
    time::{Duration, Instant},
};
use tokio::{net::TcpStream, time::sleep};
use tracing::{debug, info};

pub const DEFAULT_WAIT: Duration = Duration::from_secs(90);
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

async fn poll_until<F, Fut>(what: String, limit: Duration, mut probe: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = Instant::now() + limit;
    let mut backoff = INITIAL_BACKOFF;
    loop {
        if probe().await {
            info!("{what} is available");
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(Error::Timeout(limit, what));
        }
        debug!("{what} is not available yet, retrying in {backoff:?}");
        sleep(backoff.min(deadline - now)).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

pub async fn wait_for_file(path: &Path, limit: Duration) -> Result<()> {
    poll_until(format!("file {path:?}"), limit, || async move {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    })
    .await
}

/// Each connection attempt is bounded by the time left before `limit` elapses.
pub async fn wait_for_port(host: &str, port: u16, limit: Duration) -> Result<()> {
    let deadline = Instant::now() + limit;
    poll_until(format!("{host}:{port}"), limit, || async move {
        let attempt = deadline
            .saturating_duration_since(Instant::now())
            .min(MAX_BACKOFF);
        matches!(
            tokio::time::timeout(attempt, TcpStream::connect((host, port))).await,
            Ok(Ok(_))
        )
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use color_eyre::eyre::Result;
    use assert_matches::assert_matches;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn missing_file_should_time_out() -> Result<()> {
        let tmp = assert_fs::TempDir::new()?;
        let result = wait_for_file(tmp.child("ca-cert.pem").path(), Duration::from_millis(300)).await;
        assert_matches!(result, Err(Error::Timeout(..)));
        Ok(())
    }

    #[tokio::test]
    async fn file_written_later_should_be_found() -> Result<()> {
        let tmp = assert_fs::TempDir::new()?;
        let cert = tmp.child("ca-cert.pem");
        let staged = tmp.child("ca-cert.pem.partial").path().to_path_buf();
        let path = cert.path().to_path_buf();
        tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            tokio::fs::write(&staged, "-----BEGIN CERTIFICATE-----").await?;
            tokio::fs::rename(&staged, path).await
        });

        wait_for_file(cert.path(), Duration::from_secs(10)).await?;
        cert.assert(predicates::str::starts_with("-----BEGIN"));
        Ok(())
    }

    #[tokio::test]
    async fn listening_port_should_be_detected() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        wait_for_port("127.0.0.1", port, Duration::from_secs(5)).await?;

        drop(listener);
        assert_matches!(
            wait_for_port("127.0.0.1", port, Duration::from_millis(300)).await,
            Err(Error::Timeout(..))
        );
        Ok(())
    }

    #[tokio::test]
    async fn unanswered_connect_should_not_outlast_the_limit() -> Result<()> {
        let started = Instant::now();
        // TEST-NET-1 is never routed
        assert_matches!(
            wait_for_port("192.0.2.1", 7054, Duration::from_millis(300)).await,
            Err(Error::Timeout(..))
        );
        assert!(started.elapsed() < Duration::from_secs(1));
        Ok(())
    }
}
