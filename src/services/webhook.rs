use crate::models::WebhookPayload;
use crate::utils::excerpt;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const LOG_EXCERPT_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook responded with status {status}")]
    Http { status: u16, body: String },
    #[error("webhook returned an empty body")]
    EmptyResponse,
    #[error("webhook returned malformed JSON: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl WebhookError {
    /// Message shown to the user when generation fails.
    pub fn user_message(&self) -> String {
        match self {
            WebhookError::Transport(_) | WebhookError::Http { .. } => {
                "생성 중 오류가 발생했습니다. (연결 시간이 너무 길거나 데이터 형식이 다를 수 있습니다)"
                    .to_string()
            }
            WebhookError::EmptyResponse => {
                "웹훅이 빈 응답을 반환했습니다. 웹훅의 응답(Respond to Webhook) 설정을 확인해주세요."
                    .to_string()
            }
            WebhookError::MalformedJson { .. } => {
                "웹훅 응답을 해석할 수 없습니다. 응답 데이터 형식을 확인해주세요.".to_string()
            }
        }
    }
}

pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(WebhookClient {
            client: builder.build()?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One POST per call; retries are left to the user.
    pub async fn submit(&self, payload: &WebhookPayload) -> Result<Value, WebhookError> {
        tracing::info!(
            url = %self.url,
            photo_sets = payload.photo_sets.len(),
            "submitting generation request"
        );

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body = %excerpt(&body, LOG_EXCERPT_CHARS),
                "webhook returned an error status"
            );
            return Err(WebhookError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            tracing::warn!("webhook returned an empty body; responder is likely not configured");
            return Err(WebhookError::EmptyResponse);
        }

        match serde_json::from_str(&body) {
            Ok(value) => {
                tracing::info!(bytes = body.len(), "webhook response received");
                Ok(value)
            }
            Err(source) => {
                tracing::warn!(
                    error = %source,
                    body = %excerpt(&body, LOG_EXCERPT_CHARS),
                    "webhook body is not valid JSON"
                );
                Err(WebhookError::MalformedJson { source, body })
            }
        }
    }
}
