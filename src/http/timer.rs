use crate::endpoint::Endpoint;
use crate::http::dialer::Dialer;
use crate::http::error::VisitError;
use crate::timing::{PhaseRecorder, TimingSample};
use bytes::Bytes;
use http_body_util::Empty;
use hyper::client::conn::http1;
use hyper::header::{HeaderValue, HOST, USER_AGENT};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use rustls::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::task::AbortOnDropHandle;

/// Times one GET request against an endpoint, phase by phase.
#[derive(Clone)]
pub struct ConnectionTimer {
    dialer: Dialer,
    limit: Option<Duration>,
}

impl ConnectionTimer {
    pub fn new(tls_config: Arc<ClientConfig>, limit: Option<Duration>) -> Self {
        Self {
            dialer: Dialer::new(tls_config),
            limit,
        }
    }

    /// Performs exactly one request. Redirects are reported, never followed.
    pub async fn visit(&self, endpoint: &Endpoint) -> Result<TimingSample, VisitError> {
        let mut recorder = PhaseRecorder::new();
        let attempt = self.attempt(endpoint, &mut recorder);
        let status = match self.limit {
            Some(limit) => timeout(limit, attempt)
                .await
                .map_err(|_| VisitError::Timeout(limit))??,
            None => attempt.await?,
        };

        if status.is_redirection() {
            debug!("{} answered {}, not following the redirect", endpoint, status);
        } else {
            debug!("{} answered {}", endpoint, status);
        }
        let sample = recorder.into_sample();
        debug!("{}", sample);
        Ok(sample)
    }

    async fn attempt(
        &self,
        endpoint: &Endpoint,
        recorder: &mut PhaseRecorder,
    ) -> Result<StatusCode, VisitError> {
        let request = build_request(endpoint)?;
        let io = self.dialer.dial(endpoint, recorder).await?;

        let (mut sender, conn) = http1::handshake(TokioIo::new(io)).await?;
        // Dropping the handle tears the connection down on every exit path.
        let _driver = AbortOnDropHandle::new(tokio::spawn(async move {
            if let Err(err) = conn.await {
                trace!("connection closed: {}", err);
            }
        }));

        let res = sender.send_request(request).await?;
        Ok(res.status())
    }
}

fn build_request(endpoint: &Endpoint) -> Result<Request<Empty<Bytes>>, VisitError> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(endpoint.request_target())
        .header(HOST, endpoint.authority())
        .header(
            USER_AGENT,
            HeaderValue::from_static(concat!("conntimer/", env!("CARGO_PKG_VERSION"))),
        )
        .body(Empty::new())?;
    Ok(request)
}
