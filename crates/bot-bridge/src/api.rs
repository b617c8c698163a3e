use async_trait::async_trait;
use bot_api::{BotApiError, BotClient, BotIdentity, SendMessageParams, SentMessage};

/// The Bot API calls the bridge relies on.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_me(&self, token: &str) -> Result<BotIdentity, BotApiError>;

    async fn send_message(
        &self,
        token: &str,
        params: &SendMessageParams,
    ) -> Result<SentMessage, BotApiError>;

    async fn set_webhook(&self, token: &str, url: &str) -> Result<(), BotApiError>;

    async fn delete_webhook(&self, token: &str) -> Result<(), BotApiError>;
}

#[async_trait]
impl BotApi for BotClient {
    async fn get_me(&self, token: &str) -> Result<BotIdentity, BotApiError> {
        BotClient::get_me(self, token).await
    }

    async fn send_message(
        &self,
        token: &str,
        params: &SendMessageParams,
    ) -> Result<SentMessage, BotApiError> {
        BotClient::send_message(self, token, params).await
    }

    async fn set_webhook(&self, token: &str, url: &str) -> Result<(), BotApiError> {
        BotClient::set_webhook(self, token, url).await
    }

    async fn delete_webhook(&self, token: &str) -> Result<(), BotApiError> {
        BotClient::delete_webhook(self, token).await
    }
}
