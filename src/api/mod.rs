mod models;

pub use models::*;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("auth: {0}")]
    Auth(String),

    #[error("decode: {0}")]
    Decode(String),
}

/// Supplies the bearer token for authenticated requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, ApiError>;
}

/// The part of the backend driven by the utility controller
#[async_trait]
pub trait CampsiteApi: Send + Sync {
    async fn fetch_state(&self, campsite_id: &str) -> Result<CampsiteState, ApiError>;
    async fn send_command(&self, campsite_id: &str, command: &Command) -> Result<(), ApiError>;
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token_source: Arc<dyn TokenSource>
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, token_source: Arc<dyn TokenSource>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(ApiClient {
            http: http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_source: token_source
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authed(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ApiError> {
        let token = self.token_source.token().await?;
        Ok(builder.bearer_auth(token))
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Server { status: status.as_u16(), message: body });
        }
        Ok(resp)
    }

    async fn parse<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R, ApiError> {
        Self::check(resp).await?
            .json::<R>()
            .await
            .map_err(|err| ApiError::Decode(format!("response body: {}", err)))
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        debug!("GET {}", path);
        let req = self.authed(self.http.get(self.url(path))).await?;
        Self::parse(req.send().await?).await
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        debug!("POST /auth/login");
        let resp = self.http.post(self.url("/auth/login"))
            .json(credentials)
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn register(&self, form: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        debug!("POST /auth/register");
        let resp = self.http.post(self.url("/auth/register"))
            .json(form)
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn profile(&self) -> Result<Profile, ApiError> {
        self.get("/user/profile").await
    }

    pub async fn campsites(&self) -> Result<Vec<Campsite>, ApiError> {
        self.get("/campsites").await
    }

    pub async fn campsite_state(&self, campsite_id: &str) -> Result<CampsiteState, ApiError> {
        self.get(&format!("/campsites/{}/state", campsite_id)).await
    }

    pub async fn pricing(&self) -> Result<Pricing, ApiError> {
        self.get("/admin/pricing").await
    }

    pub async fn update_pricing(&self, pricing: &Pricing) -> Result<Pricing, ApiError> {
        debug!("PUT /admin/pricing");
        let req = self.authed(self.http.put(self.url("/admin/pricing")).json(pricing)).await?;
        Self::parse(req.send().await?).await
    }

    pub async fn request_booking(&self, request: &BookingRequest) -> Result<Booking, ApiError> {
        debug!("POST /bookings/request");
        let req = self.authed(self.http.post(self.url("/bookings/request")).json(request)).await?;
        Self::parse(req.send().await?).await
    }

    pub async fn bookings(&self) -> Result<Vec<Booking>, ApiError> {
        self.get("/bookings").await
    }

    pub async fn cancel_booking(&self, booking_id: &str) -> Result<(), ApiError> {
        let path = format!("/bookings/{}/cancel", booking_id);
        debug!("POST {}", path);
        let req = self.authed(self.http.post(self.url(&path))).await?;
        Self::check(req.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl CampsiteApi for ApiClient {
    async fn fetch_state(&self, campsite_id: &str) -> Result<CampsiteState, ApiError> {
        self.campsite_state(campsite_id).await
    }

    async fn send_command(&self, campsite_id: &str, command: &Command) -> Result<(), ApiError> {
        let path = format!("/campsites/{}/command", campsite_id);
        debug!("POST {} {:?}", path, command);
        let req = self.authed(self.http.post(self.url(&path)).json(&CommandRequest { command })).await?;
        Self::check(req.send().await?).await?;
        Ok(())
    }
}
