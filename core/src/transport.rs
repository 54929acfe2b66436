//! Executes `HttpRequest` values against the network.
//!
//! Non-2xx responses come back as `HttpResponse` data so status handling
//! stays in `ReminderClient`. Only failures to complete the exchange are
//! errors.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use async_trait::async_trait;

    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    use super::Transport;

    /// `Transport` backed by a shared `reqwest::Client`. No timeout is set
    /// beyond reqwest's defaults.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.path),
                HttpMethod::Post => self.client.post(&request.path),
            };
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(TransportError::new)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
                .collect();
            let body = response.text().await.map_err(TransportError::new)?;

            Ok(HttpResponse { status, headers, body })
        }
    }
}
