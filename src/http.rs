//! Native transport for the game service.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{CONTENT_TYPE, COOKIE, REFERER};
use serde::de::DeserializeOwned;

use crate::csrf::{CsrfToken, COOKIE_NAME};
use crate::schema::{AiMove, FeedbackPayload, GameId, MoveHistory, MoveRequest, TransportError};
use crate::service::{GameEndpoints, GameService, ServiceResult};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Upper bound for a single request, so a stalled server cannot hold the CLI
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpGameService {
    client: reqwest::Client,
    endpoints: GameEndpoints,
    csrf: Option<CsrfToken>,
    session: Option<String>,
}

impl HttpGameService {
    pub fn new(base_url: &str) -> ServiceResult<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("Could not build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoints: GameEndpoints::with_base(base_url),
            csrf: None,
            session: None,
        })
    }

    pub fn with_csrf_token(mut self, token: CsrfToken) -> Self {
        self.csrf = Some(token);
        self
    }

    /// Session cookie used to authenticate against the server.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// The server compares the header token against its cookie, so both are sent.
    fn cookie_header(&self) -> Option<String> {
        let mut cookies = Vec::new();
        if let Some(token) = &self.csrf {
            cookies.push(format!("{}={}", COOKIE_NAME, token.value()));
        }
        if let Some(session) = &self.session {
            cookies.push(format!("sessionid={}", session));
        }
        if cookies.is_empty() {
            None
        } else {
            Some(cookies.join("; "))
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method.clone(), url)
            .header(REFERER, format!("{}/", self.endpoints.base()));
        if let Some((name, value)) = self
            .csrf
            .as_ref()
            .and_then(|token| token.header_for(method.as_str(), false))
        {
            builder = builder.header(name, value);
        }
        if let Some(cookies) = self.cookie_header() {
            builder = builder.header(COOKIE, cookies);
        }
        builder
    }

    async fn send(builder: reqwest::RequestBuilder) -> ServiceResult<String> {
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> ServiceResult<T> {
        let body = Self::send(self.request(reqwest::Method::GET, url)).await?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait(?Send)]
impl GameService for HttpGameService {
    async fn submit_move(
        &self,
        game_id: &GameId,
        request: &MoveRequest,
    ) -> ServiceResult<FeedbackPayload> {
        let url = self.endpoints.submit_move(game_id);
        debug!("POST {} move_uci={}", url, request.move_uci);

        let builder = self
            .request(reqwest::Method::POST, url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(request.to_form_body());
        Self::send(builder).await.map(FeedbackPayload::new)
    }

    async fn ai_move(&self, game_id: &GameId) -> ServiceResult<AiMove> {
        self.get_json(self.endpoints.ai_move(game_id)).await
    }

    async fn move_history(&self, game_id: &GameId) -> ServiceResult<MoveHistory> {
        self.get_json(self.endpoints.move_history(game_id)).await
    }
}
