//! Browser transport and timers for the game service.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::abortable;
use gloo::net::http::{Request, RequestBuilder, Response};
use gloo::timers::future::TimeoutFuture;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::csrf::CsrfToken;
use crate::scheduler::{ScheduledTask, Scheduler, Task};
use crate::schema::{AiMove, FeedbackPayload, GameId, MoveHistory, MoveRequest, TransportError};
use crate::service::{GameEndpoints, GameService, ServiceResult};

/// The page's `document.cookie`, empty when unavailable.
pub fn document_cookie() -> String {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.dyn_into::<web_sys::HtmlDocument>().ok())
        .and_then(|d| d.cookie().ok())
        .unwrap_or_default()
}

/// Same-origin client. The token is re-read from the cookie on every request.
#[derive(Debug, Clone, Default)]
pub struct BrowserGameService {
    endpoints: GameEndpoints,
}

impl BrowserGameService {
    pub fn new() -> Self {
        Self {
            endpoints: GameEndpoints::same_origin(),
        }
    }

    fn with_token(builder: RequestBuilder, method: &str) -> RequestBuilder {
        match CsrfToken::from_cookies(&document_cookie()) {
            Some(token) => match token.header_for(method, false) {
                Some((name, value)) => builder.header(name, value),
                None => builder,
            },
            None => {
                if crate::csrf::requires_token(method) {
                    warn!("No csrftoken cookie, sending {} without token", method);
                }
                builder
            }
        }
    }

    async fn read_body(response: Response) -> ServiceResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !response.ok() {
            return Err(TransportError::Status { status, body });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ServiceResult<T> {
        let response = Self::with_token(Request::get(url), "GET")
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let body = Self::read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait(?Send)]
impl GameService for BrowserGameService {
    async fn submit_move(
        &self,
        game_id: &GameId,
        request: &MoveRequest,
    ) -> ServiceResult<FeedbackPayload> {
        let url = self.endpoints.submit_move(game_id);
        debug!("POST {} move_uci={}", url, request.move_uci);

        let response = Self::with_token(Request::post(&url), "POST")
            .header(
                "Content-Type",
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .body(request.to_form_body())
            .map_err(|e| TransportError::Network(e.to_string()))?
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Self::read_body(response).await.map(FeedbackPayload::new)
    }

    async fn ai_move(&self, game_id: &GameId) -> ServiceResult<AiMove> {
        self.get_json(&self.endpoints.ai_move(game_id)).await
    }

    async fn move_history(&self, game_id: &GameId) -> ServiceResult<MoveHistory> {
        self.get_json(&self.endpoints.move_history(game_id)).await
    }
}

/// `setTimeout` backed scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let (delayed, handle) = abortable(async move {
            TimeoutFuture::new(millis).await;
            task();
        });
        spawn_local(async move {
            let _ = delayed.await;
        });
        ScheduledTask::new(move || handle.abort())
    }
}
