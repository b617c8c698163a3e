//! Pairing and push flows against an in-memory database and a fake Bot API.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bot_api::{BotApiError, BotChat, BotIdentity, BotUser, IncomingMessage, SendMessageParams, SentMessage, Update};
use bot_bridge::{BotApi, BotBridge, BridgeConfig, BridgeError, UpdateOutcome};
use database::{bot_pairing, chat, site, user, Database, Direction, Site, User};

const GOOD_TOKEN: &str = "123:good";
const OTHER_TOKEN: &str = "456:other";

#[derive(Default)]
struct FakeBotApi {
    sent: Mutex<Vec<(String, SendMessageParams)>>,
    webhooks: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_webhook: bool,
    blocked_chat: Option<String>,
}

impl FakeBotApi {
    fn sent(&self) -> Vec<(String, SendMessageParams)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BotApi for FakeBotApi {
    async fn get_me(&self, token: &str) -> Result<BotIdentity, BotApiError> {
        match token {
            GOOD_TOKEN | OTHER_TOKEN => Ok(BotIdentity {
                id: 1,
                is_bot: true,
                first_name: "Shop".to_string(),
                username: Some(format!("bot_{}", &token[..3])),
            }),
            "789:human" => Ok(BotIdentity {
                id: 2,
                is_bot: false,
                first_name: "Human".to_string(),
                username: None,
            }),
            _ => Err(BotApiError::Api {
                code: 401,
                description: "Unauthorized".to_string(),
            }),
        }
    }

    async fn send_message(&self, token: &str, params: &SendMessageParams) -> Result<SentMessage, BotApiError> {
        if self.blocked_chat.as_deref() == Some(params.chat_id.as_str()) {
            return Err(BotApiError::Api {
                code: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((token.to_string(), params.clone()));
        Ok(SentMessage { message_id: 1 })
    }

    async fn set_webhook(&self, _token: &str, url: &str) -> Result<(), BotApiError> {
        if self.fail_webhook {
            return Err(BotApiError::Timeout);
        }
        self.webhooks.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn delete_webhook(&self, token: &str) -> Result<(), BotApiError> {
        self.deleted.lock().unwrap().push(token.to_string());
        Ok(())
    }
}

async fn test_db() -> Database {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();

    user::create_user(
        db.pool(),
        &User {
            id: "owner-1".to_string(),
            email: Some("owner@example.com".to_string()),
            name: "Owner".to_string(),
        },
    )
    .await
    .unwrap();
    site::create_site(
        db.pool(),
        &Site {
            id: "site-1".to_string(),
            name: "Shop".to_string(),
            domain: Some("shop.example.com".to_string()),
            owner_id: "owner-1".to_string(),
        },
    )
    .await
    .unwrap();
    db
}

fn bridge(db: &Database, api: Arc<FakeBotApi>) -> BotBridge {
    let config = BridgeConfig::new("https://admin.example.com").with_webhook_base("https://chat.example.com");
    BotBridge::new(db.clone(), api, config)
}

fn update(chat_id: i64, text: &str) -> Update {
    Update {
        update_id: 1,
        message: Some(IncomingMessage {
            message_id: 10,
            from: Some(BotUser {
                id: chat_id,
                is_bot: false,
                first_name: Some("Olha".to_string()),
                username: Some("olha".to_string()),
            }),
            chat: BotChat { id: chat_id },
            text: Some(text.to_string()),
        }),
    }
}

#[tokio::test]
async fn test_setup_registers_webhook_and_status_hides_credential() {
    let db = test_db().await;
    let api = Arc::new(FakeBotApi::default());
    let bridge = bridge(&db, api.clone());

    let result = bridge.setup("site-1", GOOD_TOKEN).await.unwrap();
    assert_eq!(result.bot_username, "bot_123");
    assert_eq!(result.connect_code.len(), 6);

    assert_eq!(
        api.webhooks.lock().unwrap().as_slice(),
        ["https://chat.example.com/bot/webhook/site-1".to_string()]
    );

    let status = bridge.status("site-1").await.unwrap();
    assert!(status.enabled);
    assert_eq!(status.connect_code.as_deref(), Some(result.connect_code.as_str()));
    assert_eq!(
        status.webhook_url.as_deref(),
        Some("https://chat.example.com/bot/webhook/site-1")
    );
    let json = serde_json::to_string(&status).unwrap();
    assert!(!json.contains(GOOD_TOKEN));
}

#[tokio::test]
async fn test_invalid_credential_leaves_pairing_untouched() {
    let db = test_db().await;
    let api = Arc::new(FakeBotApi::default());
    let bridge = bridge(&db, api);

    let first = bridge.setup("site-1", GOOD_TOKEN).await.unwrap();

    for bad in ["000:bad", "789:human"] {
        let err = bridge.setup("site-1", bad).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidCredential));
    }

    let pairing = bot_pairing::get_pairing(db.pool(), "site-1").await.unwrap().unwrap();
    assert_eq!(pairing.bot_credential, GOOD_TOKEN);
    assert_eq!(pairing.connect_code, first.connect_code);
}

#[tokio::test]
async fn test_webhook_failure_keeps_pairing() {
    let db = test_db().await;
    let api = Arc::new(FakeBotApi {
        fail_webhook: true,
        ..Default::default()
    });
    let bridge = bridge(&db, api);

    bridge.setup("site-1", GOOD_TOKEN).await.unwrap();
    let status = bridge.status("site-1").await.unwrap();
    assert!(status.enabled);
    assert!(status.webhook_url.is_none());
}

#[tokio::test]
async fn test_start_command_flow() {
    let db = test_db().await;
    let api = Arc::new(FakeBotApi::default());
    let bridge = bridge(&db, api.clone());
    let code = bridge.setup("site-1", GOOD_TOKEN).await.unwrap().connect_code;

    assert_eq!(
        bridge.handle_update("site-1", &update(42, "hello there")).await.unwrap(),
        UpdateOutcome::Ignored
    );
    assert_eq!(
        bridge.handle_update("site-1", &update(42, "/start")).await.unwrap(),
        UpdateOutcome::UsageHint
    );
    assert_eq!(
        bridge.handle_update("site-1", &update(42, &code)).await.unwrap(),
        UpdateOutcome::Ignored
    );

    // Codes are case-sensitive.
    bot_pairing::upsert_pairing(db.pool(), "site-1", "bot_123", GOOD_TOKEN, "ABC123")
        .await
        .unwrap();
    let code = "ABC123".to_string();
    assert_eq!(
        bridge.handle_update("site-1", &update(42, "/start abc123")).await.unwrap(),
        UpdateOutcome::InvalidCode
    );

    // The code is multi-use.
    for chat_id in [42, 43] {
        assert_eq!(
            bridge
                .handle_update("site-1", &update(chat_id, &format!("/start {}", code)))
                .await
                .unwrap(),
            UpdateOutcome::Subscribed
        );
    }

    let subscribers = bridge.subscribers("site-1").await.unwrap();
    assert_eq!(subscribers.len(), 2);
    assert_eq!(subscribers[0].username.as_deref(), Some("olha"));
    assert_eq!(bridge.status("site-1").await.unwrap().subscribers_count, 2);

    let replies = api.sent();
    assert!(replies.iter().all(|(token, _)| token == GOOD_TOKEN));
    assert!(replies[0].1.text.contains("/start CONNECT_CODE"));
}

#[tokio::test]
async fn test_start_without_pairing_is_invalid() {
    let db = test_db().await;
    let api = Arc::new(FakeBotApi::default());
    let bridge = bridge(&db, api.clone());

    let outcome = bridge.handle_update("site-1", &update(42, "/start ABC123")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::InvalidCode);
    assert!(api.sent().is_empty());
    assert!(bridge.subscribers("site-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resetup_keeps_subscribers() {
    let db = test_db().await;
    let api = Arc::new(FakeBotApi::default());
    let bridge = bridge(&db, api);

    let code = bridge.setup("site-1", GOOD_TOKEN).await.unwrap().connect_code;
    bridge
        .handle_update("site-1", &update(42, &format!("/start {}", code)))
        .await
        .unwrap();

    let second = bridge.setup("site-1", OTHER_TOKEN).await.unwrap();
    assert_eq!(second.bot_username, "bot_456");
    assert_eq!(bridge.status("site-1").await.unwrap().subscribers_count, 1);
}

#[tokio::test]
async fn test_push_reports_each_subscriber() {
    let db = test_db().await;
    let api = Arc::new(FakeBotApi {
        blocked_chat: Some("43".to_string()),
        ..Default::default()
    });
    let bridge = bridge(&db, api.clone());

    let code = bridge.setup("site-1", GOOD_TOKEN).await.unwrap().connect_code;
    for chat_id in [41, 42, 43] {
        bot_pairing::upsert_subscription(db.pool(), "site-1", &chat_id.to_string(), None, None)
            .await
            .unwrap();
    }
    assert_eq!(code.len(), 6);

    let conversation = chat::create_chat(db.pool(), "site-1", "visitor-1", None).await.unwrap();
    chat::create_message(db.pool(), &conversation.id, Direction::Visitor, &"x".repeat(300))
        .await
        .unwrap();

    let report = bridge.notify_visitor_message("site-1", &conversation.id).await.unwrap();
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 1);

    let pushes = api.sent();
    assert_eq!(pushes.len(), 2);
    let (_, params) = &pushes[0];
    assert!(params.text.contains("Visitor: Anonymous"));
    assert!(params.text.contains("Site: shop.example.com"));
    assert!(params.text.contains(&format!("{}…", "x".repeat(200))));
    let button = &params.reply_markup.as_ref().unwrap().inline_keyboard[0][0];
    assert_eq!(button.text, "Open conversation");
    assert_eq!(button.url, format!("https://admin.example.com/chats/{}", conversation.id));
}

#[tokio::test]
async fn test_push_without_pairing_is_empty() {
    let db = test_db().await;
    let api = Arc::new(FakeBotApi::default());
    let bridge = bridge(&db, api.clone());

    let report = bridge.notify_visitor_message("site-1", "missing").await.unwrap();
    assert_eq!(report.attempted(), 0);
    assert!(api.sent().is_empty());
}

#[tokio::test]
async fn test_push_for_another_sites_conversation_is_dropped() {
    let db = test_db().await;
    user::create_user(
        db.pool(),
        &User {
            id: "owner-2".to_string(),
            email: Some("other@example.com".to_string()),
            name: "Other".to_string(),
        },
    )
    .await
    .unwrap();
    site::create_site(
        db.pool(),
        &Site {
            id: "site-2".to_string(),
            name: "Other shop".to_string(),
            domain: None,
            owner_id: "owner-2".to_string(),
        },
    )
    .await
    .unwrap();

    let api = Arc::new(FakeBotApi::default());
    let bridge = bridge(&db, api.clone());
    bridge.setup("site-2", OTHER_TOKEN).await.unwrap();
    bot_pairing::upsert_subscription(db.pool(), "site-2", "77", None, None)
        .await
        .unwrap();

    let conversation = chat::create_chat(db.pool(), "site-1", "visitor-1", Some("Ada")).await.unwrap();
    chat::create_message(db.pool(), &conversation.id, Direction::Visitor, "private order details")
        .await
        .unwrap();

    let report = bridge.notify_visitor_message("site-2", &conversation.id).await.unwrap();
    assert_eq!(report.attempted(), 0);
    assert!(api.sent().is_empty());
}

#[tokio::test]
async fn test_disconnect_removes_pairing_and_subscribers() {
    let db = test_db().await;
    let api = Arc::new(FakeBotApi::default());
    let bridge = bridge(&db, api.clone());

    let code = bridge.setup("site-1", GOOD_TOKEN).await.unwrap().connect_code;
    bridge
        .handle_update("site-1", &update(42, &format!("/start {}", code)))
        .await
        .unwrap();

    bridge.disconnect("site-1").await.unwrap();
    assert_eq!(api.deleted.lock().unwrap().as_slice(), [GOOD_TOKEN.to_string()]);
    assert!(!bridge.status("site-1").await.unwrap().enabled);
    assert!(bridge.subscribers("site-1").await.unwrap().is_empty());

    // Second disconnect is a no-op.
    bridge.disconnect("site-1").await.unwrap();
    assert_eq!(api.deleted.lock().unwrap().len(), 1);
}
