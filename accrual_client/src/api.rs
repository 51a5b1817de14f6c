use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER},
    Client,
    Response,
    StatusCode,
};

use crate::{
    config::AccrualConfig,
    data_objects::AccrualResponseBody,
    helpers::{is_json_content_type, parse_retry_after},
    AccrualApiError,
    AccrualOutcome,
};

const ORDERS_PATH: &str = "/api/orders/";

#[derive(Clone)]
pub struct AccrualApi {
    config: AccrualConfig,
    client: Arc<Client>,
}

impl AccrualApi {
    pub fn new(config: AccrualConfig) -> Result<Self, AccrualApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| AccrualApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &AccrualConfig {
        &self.config
    }

    pub fn url(&self, order_id: &str) -> String {
        format!("{}{ORDERS_PATH}{order_id}", self.config.base_url)
    }

    /// Asks the accrual service about a single order and classifies the answer.
    ///
    /// Only transport failures are retried here, following `retry_delays`. Every reply the server actually sends,
    /// including 429 and 500, is returned as an [`AccrualOutcome`] on the first attempt.
    pub async fn query_order(&self, order_id: &str) -> Result<AccrualOutcome, AccrualApiError> {
        let url = self.url(order_id);
        trace!("🧮️ Querying accrual for order {order_id}: {url}");
        let response = self.send_with_retry(&url).await?;
        let outcome = self.classify(response, order_id).await;
        debug!("🧮️ Accrual query for order {order_id}: {outcome}");
        Ok(outcome)
    }

    async fn send_with_retry(&self, url: &str) -> Result<Response, AccrualApiError> {
        let attempts = self.config.retry_delays.len() + 1;
        let mut last_error = match self.client.get(url).send().await {
            Ok(response) => return Ok(response),
            Err(e) => {
                warn!("🧮️ Accrual request failed on the first attempt: {e}");
                e
            },
        };
        for (i, delay) in self.config.retry_delays.iter().enumerate() {
            info!("🧮️ Retrying accrual request in {}s (retry {} of {})", delay.as_secs(), i + 1, attempts - 1);
            tokio::time::sleep(*delay).await;
            match self.client.get(url).send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("🧮️ Accrual request retry {} failed: {e}", i + 1);
                    last_error = e;
                },
            }
        }
        error!("🧮️ Giving up on accrual request after {attempts} attempts: {last_error}");
        Err(AccrualApiError::Network { attempts, message: last_error.to_string() })
    }

    async fn classify(&self, response: Response, order_id: &str) -> AccrualOutcome {
        match response.status() {
            StatusCode::OK => Self::decode_body(response, order_id).await,
            StatusCode::NO_CONTENT => AccrualOutcome::NoContent,
            StatusCode::TOO_MANY_REQUESTS => {
                let header = response.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok());
                let retry_after = parse_retry_after(header).unwrap_or_else(|| {
                    warn!(
                        "🧮️ Rate limited without a usable Retry-After header ({header:?}). Waiting {}s",
                        self.config.default_retry_after.as_secs()
                    );
                    self.config.default_retry_after
                });
                AccrualOutcome::TooManyRequests { retry_after }
            },
            StatusCode::INTERNAL_SERVER_ERROR => AccrualOutcome::InternalError,
            other => AccrualOutcome::UnexpectedStatus(other.as_u16()),
        }
    }

    async fn decode_body(response: Response, order_id: &str) -> AccrualOutcome {
        let content_type = response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(String::from);
        if !is_json_content_type(content_type.as_deref()) {
            return AccrualOutcome::MalformedResponse(format!(
                "expected application/json, got {}",
                content_type.as_deref().unwrap_or("no content type")
            ));
        }
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return AccrualOutcome::MalformedResponse(format!("could not read body: {e}")),
        };
        let body = match serde_json::from_slice::<AccrualResponseBody>(&bytes) {
            Ok(b) => b,
            Err(e) => {
                return AccrualOutcome::MalformedResponse(format!(
                    "could not decode {}: {e}",
                    String::from_utf8_lossy(&bytes)
                ))
            },
        };
        match body.into_response(order_id) {
            Ok(r) => AccrualOutcome::Accrual(r),
            Err(reason) => AccrualOutcome::MalformedResponse(reason),
        }
    }
}
