use crate::record::MetricsRecord;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("не удалось сериализовать запись: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("POST {url} не выполнен: {source}")]
    Request { url: Url, source: reqwest::Error },
    #[error("POST {url} вернул {status}: {body}")]
    Status {
        url: Url,
        status: StatusCode,
        body: String,
    },
}

pub trait Transport {
    async fn send(&self, record: &MetricsRecord) -> Result<String, TransportError>;
}

pub struct LogstashClient {
    client: Client,
    endpoint: Url,
}

impl LogstashClient {
    pub fn new(endpoint: Url) -> Self {
        let client = Client::builder()
            .user_agent(concat!("cluster-watch/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, endpoint }
    }
}

impl Transport for LogstashClient {
    async fn send(&self, record: &MetricsRecord) -> Result<String, TransportError> {
        let body = serde_json::to_vec(record)?;
        let request_err = |source: reqwest::Error| TransportError::Request {
            url: self.endpoint.clone(),
            source,
        };

        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .body(body)
            .send()
            .await
            .map_err(request_err)?;

        let status = resp.status();
        let text = resp.text().await.map_err(request_err)?;
        if !status.is_success() {
            return Err(TransportError::Status {
                url: self.endpoint.clone(),
                status,
                body: text,
            });
        }
        Ok(text)
    }
}
