//! Signed REST client for the Apex Omni v3 API
//!
//! [`ApexClient::request`] signs and sends one request; [`ApexClient::public_request`]
//! sends an unsigned GET. Neither retries: a failed call surfaces as
//! [`Error::Transport`] (no response) or [`Error::Api`] (error status) and the
//! caller decides what to do next.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::consts::{
    API_PREFIX, CONTENT_TYPE_JSON, HEADER_API_KEY, HEADER_PASSPHRASE, HEADER_SIGNATURE,
    HEADER_TIMESTAMP,
};
use crate::credentials::Credentials;
use crate::helpers::{now_millis, BaseUrl};
use crate::prelude::*;
use crate::req::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestParams, ReqwestTransport};
use crate::signature::{canonicalize, SignedRequest};

pub struct ApexClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    credentials: Option<Credentials>,
}

impl ApexClient {
    /// Authenticated client over the default `reqwest` transport
    pub fn new(base_url: BaseUrl, credentials: Credentials) -> Result<Self> {
        Ok(Self::with_transport(
            base_url.get_url(),
            Some(credentials),
            Arc::new(ReqwestTransport::with_default_timeout()?),
        ))
    }

    /// Client for public endpoints only
    pub fn public(base_url: BaseUrl) -> Result<Self> {
        Ok(Self::with_transport(
            base_url.get_url(),
            None,
            Arc::new(ReqwestTransport::with_default_timeout()?),
        ))
    }

    pub fn with_transport(
        base_url: impl Into<String>,
        credentials: Option<Credentials>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Sign and send one request. `path` is the full API path, e.g.
    /// `/api/v3/order`, and is what gets signed.
    pub async fn request(&self, method: HttpMethod, path: &str, params: RequestParams) -> Result<Value> {
        let request = self.build_signed(method, path, &params, now_millis())?;
        self.dispatch(request).await
    }

    /// Unsigned GET
    pub async fn public_request(&self, path: &str, params: RequestParams) -> Result<Value> {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: self.url_with_query(path, &params),
            headers: vec![("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string())],
            body: None,
        };
        self.dispatch(request).await
    }

    pub(crate) fn build_signed(
        &self,
        method: HttpMethod,
        path: &str,
        params: &RequestParams,
        timestamp_ms: u64,
    ) -> Result<HttpRequest> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| Error::MissingCredentials(format!("{} {} requires an API key", method, path)))?;

        let signed = SignedRequest::new(credentials, method, path, params, timestamp_ms);

        let headers = vec![
            (HEADER_SIGNATURE.to_string(), signed.signature),
            (HEADER_TIMESTAMP.to_string(), signed.timestamp),
            (HEADER_API_KEY.to_string(), credentials.api_key().to_string()),
            (HEADER_PASSPHRASE.to_string(), credentials.passphrase().to_string()),
            ("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()),
        ];

        let (url, body) = if method.is_get() {
            (self.url_with_query(path, params), None)
        } else {
            (format!("{}{}", self.base_url, path), Some(signed.canonical_params))
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    fn url_with_query(&self, path: &str, params: &RequestParams) -> String {
        let query = canonicalize(params);
        if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        }
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<Value> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        debug!("{} {} -> {}", method, url, response.status);
        Self::parse_response(response)
    }

    fn parse_response(response: HttpResponse) -> Result<Value> {
        if !response.is_success() {
            return Err(Error::Api {
                status: response.status,
                body: response.body,
            });
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    fn path(endpoint: &str) -> String {
        format!("{}{}", API_PREFIX, endpoint)
    }

    // Public endpoints

    pub async fn get_time(&self) -> Result<Value> {
        self.public_request(&Self::path("/time"), RequestParams::new()).await
    }

    pub async fn get_symbols(&self) -> Result<Value> {
        self.public_request(&Self::path("/symbols"), RequestParams::new()).await
    }

    /// Ticker for one symbol, or every symbol when `None`
    pub async fn get_ticker(&self, symbol: Option<&str>) -> Result<Value> {
        let params = RequestParams::new().with_opt("symbol", symbol);
        self.public_request(&Self::path("/ticker"), params).await
    }

    pub async fn get_depth(&self, symbol: &str, limit: u32) -> Result<Value> {
        let params = RequestParams::new().with("symbol", symbol).with("limit", limit);
        self.public_request(&Self::path("/depth"), params).await
    }

    // Authenticated endpoints

    pub async fn get_user(&self) -> Result<Value> {
        self.request(HttpMethod::Get, &Self::path("/user"), RequestParams::new()).await
    }

    pub async fn get_account(&self) -> Result<Value> {
        self.request(HttpMethod::Get, &Self::path("/account"), RequestParams::new()).await
    }

    pub async fn get_account_balance(&self) -> Result<Value> {
        self.request(HttpMethod::Get, &Self::path("/account-balance"), RequestParams::new())
            .await
    }

    pub async fn get_open_orders(&self) -> Result<Value> {
        self.request(HttpMethod::Get, &Self::path("/open-orders"), RequestParams::new())
            .await
    }

    pub async fn get_history_orders(&self, params: RequestParams) -> Result<Value> {
        self.request(HttpMethod::Get, &Self::path("/history-orders"), params).await
    }

    pub async fn create_order(&self, params: RequestParams) -> Result<Value> {
        self.request(HttpMethod::Post, &Self::path("/order"), params).await
    }

    pub async fn cancel_order(&self, order_id: &str) -> Result<Value> {
        let params = RequestParams::new().with("id", order_id);
        self.request(HttpMethod::Delete, &Self::path("/delete-order"), params).await
    }

    pub async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<Value> {
        let params = RequestParams::new().with_opt("symbol", symbol);
        self.request(HttpMethod::Delete, &Self::path("/delete-open-orders"), params)
            .await
    }

    pub async fn get_fills(&self, params: RequestParams) -> Result<Value> {
        self.request(HttpMethod::Get, &Self::path("/fills"), params).await
    }
}
