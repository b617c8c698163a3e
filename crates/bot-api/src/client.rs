//! Bot API HTTP client.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::BotApiConfig;
use crate::error::BotApiError;
use crate::types::{
    ApiResponse, BotIdentity, SendMessageParams, SentMessage, SetWebhookParams,
};

/// Client for the Bot API.
///
/// One client serves every tenant: the bot token is passed per call, so the
/// same connection pool is shared across pairings.
#[derive(Clone)]
pub struct BotClient {
    http: Client,
    config: BotApiConfig,
}

impl BotClient {
    /// Create a new client.
    pub fn new(config: BotApiConfig) -> Result<Self, BotApiError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(BotApiError::from)?;

        Ok(Self { http, config })
    }

    /// Resolve a token to the bot identity behind it.
    #[instrument(skip_all)]
    pub async fn get_me(&self, token: &str) -> Result<BotIdentity, BotApiError> {
        self.call::<(), _>(token, "getMe", None).await
    }

    /// Send a text message, optionally with a link button.
    #[instrument(skip(self, token, params), fields(chat_id = %params.chat_id))]
    pub async fn send_message(
        &self,
        token: &str,
        params: &SendMessageParams,
    ) -> Result<SentMessage, BotApiError> {
        self.call(token, "sendMessage", Some(params)).await
    }

    /// Point the bot's updates at a webhook URL.
    #[instrument(skip(self, token))]
    pub async fn set_webhook(&self, token: &str, url: &str) -> Result<(), BotApiError> {
        let _: bool = self
            .call(token, "setWebhook", Some(&SetWebhookParams { url }))
            .await?;
        Ok(())
    }

    /// Remove the bot's webhook.
    #[instrument(skip_all)]
    pub async fn delete_webhook(&self, token: &str) -> Result<(), BotApiError> {
        let _: bool = self.call::<(), _>(token, "deleteWebhook", None).await?;
        Ok(())
    }

    /// Get the configuration.
    pub fn config(&self) -> &BotApiConfig {
        &self.config
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        token: &str,
        method: &str,
        params: Option<&P>,
    ) -> Result<R, BotApiError> {
        let url = self.config.method_url(token, method);
        debug!(method, "Bot API call");

        let request = match params {
            Some(params) => self.http.post(&url).json(params),
            None => self.http.post(&url),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let parsed: ApiResponse<R> = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) if !status.is_success() => {
                return Err(BotApiError::Api {
                    code: i32::from(status.as_u16()),
                    description: format!("unparseable error body: {}", e),
                });
            }
            Err(e) => return Err(BotApiError::Json(e)),
        };

        if !parsed.ok {
            let code = parsed
                .error_code
                .unwrap_or_else(|| i32::from(status.as_u16()));
            let description = parsed.description.unwrap_or_default();
            warn!(method, code, %description, "Bot API rejected request");
            return Err(BotApiError::Api { code, description });
        }

        parsed.result.ok_or_else(|| BotApiError::Api {
            code: i32::from(status.as_u16()),
            description: "missing result".to_string(),
        })
    }
}

impl std::fmt::Debug for BotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotClient")
            .field("config", &self.config)
            .finish()
    }
}
