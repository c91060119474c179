use crate::services::workspace::ImageFallback;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/send-email";
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 300;
// Ten pairs of phone photos as base64 data URIs, with headroom.
const DEFAULT_MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;
const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardMode {
    System,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub webhook_url: String,
    pub webhook_timeout: Option<Duration>,
    pub auth_tokens: Vec<String>,
    pub image_fallback: ImageFallback,
    pub clipboard: ClipboardMode,
    pub max_body_bytes: usize,
    pub session_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let bind = get("BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = bind.trim().parse().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: bind.clone(),
            reason: "expected host:port",
        })?;

        let number = |key: &'static str, default: u64, reason: &'static str| {
            let value = get(key, &default.to_string());
            let parsed = value.trim().parse::<u64>();
            parsed.map_err(|_| ConfigError::Invalid { key, value, reason })
        };

        let webhook_timeout = match number(
            "WEBHOOK_TIMEOUT_SECS",
            DEFAULT_WEBHOOK_TIMEOUT_SECS,
            "expected whole seconds",
        )? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let max_body_bytes =
            number("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES, "expected a byte count")?;
        let max_body_bytes = usize::try_from(max_body_bytes).map_err(|_| ConfigError::Invalid {
            key: "MAX_BODY_BYTES",
            value: max_body_bytes.to_string(),
            reason: "too large for this platform",
        })?;

        let session_ttl =
            number("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS, "expected whole seconds")?;
        if session_ttl == 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_TTL_SECS",
                value: "0".to_string(),
                reason: "must be positive",
            });
        }
        let session_ttl = Duration::from_secs(session_ttl);

        let auth_tokens = lookup("AUTH_TOKENS")
            .map(|tokens| {
                tokens
                    .split(',')
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let fallback = get("IMAGE_FALLBACK", "generated-then-uploaded");
        let image_fallback = match fallback.trim() {
            "generated" => ImageFallback::Generated,
            "uploaded" => ImageFallback::Uploaded,
            "generated-then-uploaded" => ImageFallback::GeneratedThenUploaded,
            _ => {
                return Err(ConfigError::Invalid {
                    key: "IMAGE_FALLBACK",
                    value: fallback,
                    reason: "expected generated, uploaded or generated-then-uploaded",
                });
            }
        };

        let clipboard_value = get("CLIPBOARD", "none");
        let clipboard = match clipboard_value.trim() {
            "system" => ClipboardMode::System,
            "none" => ClipboardMode::None,
            _ => {
                return Err(ConfigError::Invalid {
                    key: "CLIPBOARD",
                    value: clipboard_value,
                    reason: "expected system or none",
                });
            }
        };

        Ok(AppConfig {
            bind_addr,
            webhook_url: get("WEBHOOK_URL", DEFAULT_WEBHOOK_URL),
            webhook_timeout,
            auth_tokens,
            image_fallback,
            clipboard,
            max_body_bytes,
            session_ttl,
        })
    }
}
