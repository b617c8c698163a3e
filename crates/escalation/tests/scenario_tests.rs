//! End-to-end fallback timelines on a paused clock.
//!
//! Database work runs with the clock resumed; only queue operations run
//! while time is paused.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use database::{chat, site, user, Database, Direction, NotificationConfig, Site, User};
use escalation::{
    EscalationJob, EscalationQueue, EscalationWorker, FallbackProcessor, InMemoryQueue,
    ProcessOutcome, SkipReason,
};
use futures::future::join_all;
use mailer::{Email, MailError, MailTransport, SendStatus};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<SendStatus, MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(SendStatus::Sent {
            id: Some("msg-1".to_string()),
        })
    }
}

struct Fixture {
    db: Database,
    mailer: Arc<RecordingMailer>,
    processor: Arc<FallbackProcessor>,
    queue: Arc<InMemoryQueue>,
    chat_id: String,
}

const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);

async fn fixture() -> Fixture {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    let pool = db.pool();

    for (id, email) in [
        ("owner-1", Some("owner@example.com")),
        ("op-1", Some("op@example.com")),
        ("op-2", Some("OWNER@example.com")),
        ("op-3", None),
    ] {
        user::create_user(
            pool,
            &User {
                id: id.to_string(),
                email: email.map(str::to_string),
                name: id.to_string(),
            },
        )
        .await
        .unwrap();
    }

    site::create_site(
        pool,
        &Site {
            id: "site-1".to_string(),
            name: "Shop".to_string(),
            domain: Some("shop.example.com".to_string()),
            owner_id: "owner-1".to_string(),
        },
    )
    .await
    .unwrap();
    for op in ["op-1", "op-2", "op-3"] {
        user::add_operator(pool, "site-1", op).await.unwrap();
    }

    site::update_notification_config(
        pool,
        &NotificationConfig {
            site_id: "site-1".to_string(),
            notification_email: None,
            email_fallback_enabled: true,
            email_fallback_address: Some("support@example.com".to_string()),
            email_fallback_timeout_minutes: 5,
        },
    )
    .await
    .unwrap();

    let conversation = chat::create_chat(pool, "site-1", "visitor-1", Some("Ada"))
        .await
        .unwrap();
    chat::create_message(pool, &conversation.id, Direction::Visitor, "Hi, do you ship abroad?")
        .await
        .unwrap();
    chat::create_message(pool, &conversation.id, Direction::Visitor, "Reach me at ada@example.org")
        .await
        .unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let processor = Arc::new(FallbackProcessor::new(
        db.clone(),
        mailer.clone(),
        "https://admin.example.com",
    ));

    Fixture {
        db,
        mailer,
        processor,
        queue: Arc::new(InMemoryQueue::new()),
        chat_id: conversation.id,
    }
}

impl Fixture {
    fn job(&self) -> EscalationJob {
        EscalationJob::new("site-1", &self.chat_id)
    }
}

#[tokio::test]
async fn test_unanswered_message_emails_after_timeout() {
    let fx = fixture().await;

    tokio::time::pause();
    assert!(fx.queue.arm(fx.job(), FIVE_MINUTES).await.unwrap());

    tokio::time::advance(FIVE_MINUTES - Duration::from_secs(1)).await;
    assert!(fx.queue.claim_due(10).await.unwrap().is_empty());

    tokio::time::advance(Duration::from_secs(1)).await;
    let due = fx.queue.claim_due(10).await.unwrap();
    assert_eq!(due, vec![fx.job()]);
    tokio::time::resume();

    let outcome = fx.processor.process(&due[0]).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Sent { recipients: 2 });

    let sent = fx.mailer.sent();
    assert_eq!(sent.len(), 1);
    let email = &sent[0];
    assert_eq!(
        email.to,
        ["owner@example.com", "op@example.com"]
    );
    assert_eq!(email.subject, "[ChatIQ] New message from Ada on shop.example.com");
    assert_eq!(email.reply_to.as_deref(), Some("ada@example.org"));
    let html = email.html_body.as_deref().unwrap();
    assert!(html.contains("Hi, do you ship abroad?"));
    assert!(html.contains(&format!("https://admin.example.com/chats/{}", fx.chat_id)));
    assert!(email.body.contains("Reach me at ada@example.org"));
}

#[tokio::test]
async fn test_operator_reply_cancels_escalation() {
    let fx = fixture().await;

    tokio::time::pause();
    fx.queue.arm(fx.job(), FIVE_MINUTES).await.unwrap();

    tokio::time::advance(Duration::from_secs(2 * 60)).await;
    assert!(fx.queue.disarm(&fx.chat_id).await.unwrap());

    tokio::time::advance(Duration::from_secs(10 * 60)).await;
    assert!(fx.queue.claim_due(10).await.unwrap().is_empty());
    tokio::time::resume();

    assert!(fx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_messages_read_before_due_time_skip_email() {
    let fx = fixture().await;

    tokio::time::pause();
    fx.queue.arm(fx.job(), FIVE_MINUTES).await.unwrap();
    tokio::time::advance(FIVE_MINUTES).await;
    let due = fx.queue.claim_due(10).await.unwrap();
    tokio::time::resume();

    chat::mark_chat_read(fx.db.pool(), &fx.chat_id).await.unwrap();

    let outcome = fx.processor.process(&due[0]).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Skipped(SkipReason::NoUnreadMessages));
    assert!(fx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_second_arm_does_not_postpone() {
    let fx = fixture().await;

    tokio::time::pause();
    assert!(fx.queue.arm(fx.job(), FIVE_MINUTES).await.unwrap());

    tokio::time::advance(Duration::from_secs(3 * 60)).await;
    assert!(!fx.queue.arm(fx.job(), FIVE_MINUTES).await.unwrap());

    tokio::time::advance(Duration::from_secs(2 * 60)).await;
    assert_eq!(fx.queue.claim_due(10).await.unwrap().len(), 1);
    tokio::time::resume();
}

#[tokio::test]
async fn test_concurrent_arms_admit_one() {
    let fx = fixture().await;

    let arms = (0..16).map(|_| fx.queue.arm(fx.job(), FIVE_MINUTES));
    let results = join_all(arms).await;
    let armed = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();

    assert_eq!(armed, 1);
    assert_eq!(fx.queue.pending(&fx.chat_id).await.unwrap(), Some(fx.job()));
}

#[tokio::test]
async fn test_disarm_without_job() {
    let fx = fixture().await;
    assert!(!fx.queue.disarm("no-such-chat").await.unwrap());
}

#[tokio::test]
async fn test_disabled_after_arm_skips() {
    let fx = fixture().await;

    let mut config = site::get_notification_config(fx.db.pool(), "site-1").await.unwrap();
    config.email_fallback_enabled = false;
    site::update_notification_config(fx.db.pool(), &config).await.unwrap();

    let outcome = fx.processor.process(&fx.job()).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Skipped(SkipReason::Disabled));

    let gone = EscalationJob::new("no-site", "no-chat");
    assert_eq!(
        fx.processor.process(&gone).await.unwrap(),
        ProcessOutcome::Skipped(SkipReason::SiteGone)
    );
}

#[tokio::test]
async fn test_worker_poll_processes_due_jobs() {
    let fx = fixture().await;
    let worker = EscalationWorker::new(fx.queue.clone(), fx.processor.clone());

    fx.queue.arm(fx.job(), Duration::ZERO).await.unwrap();
    let outcomes = worker.poll_once().await;

    assert_eq!(outcomes, vec![ProcessOutcome::Sent { recipients: 2 }]);
    assert!(fx.queue.is_empty().await);
    assert!(worker.poll_once().await.is_empty());
}

#[tokio::test]
async fn test_worker_stops_on_shutdown() {
    let fx = fixture().await;
    let worker = EscalationWorker::new(fx.queue.clone(), fx.processor.clone())
        .with_poll_interval(Duration::from_millis(10));

    let (stop, stopped) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(worker.run(stopped));

    fx.queue.arm(fx.job(), Duration::ZERO).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fx.mailer.sent().len(), 1);

    stop.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_job_for_another_sites_conversation_sends_nothing() {
    let fx = fixture().await;
    let pool = fx.db.pool();

    user::create_user(
        pool,
        &User {
            id: "owner-2".to_string(),
            email: Some("owner2@example.com".to_string()),
            name: "Other".to_string(),
        },
    )
    .await
    .unwrap();
    site::create_site(
        pool,
        &Site {
            id: "site-2".to_string(),
            name: "Other".to_string(),
            domain: None,
            owner_id: "owner-2".to_string(),
        },
    )
    .await
    .unwrap();
    site::update_notification_config(
        pool,
        &NotificationConfig {
            email_fallback_enabled: true,
            ..NotificationConfig::disabled("site-2")
        },
    )
    .await
    .unwrap();

    let crossed = EscalationJob::new("site-2", &fx.chat_id);
    assert_eq!(
        fx.processor.process(&crossed).await.unwrap(),
        ProcessOutcome::Skipped(SkipReason::ConversationGone)
    );
    assert!(fx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_address_in_message_does_not_block_email() {
    let fx = fixture().await;
    let pool = fx.db.pool();

    let conversation = chat::create_chat(pool, "site-1", "visitor-2", None).await.unwrap();
    chat::create_message(pool, &conversation.id, Direction::Visitor, "help! my mail is ada@shop..com")
        .await
        .unwrap();

    let job = EscalationJob::new("site-1", &conversation.id);
    assert_eq!(
        fx.processor.process(&job).await.unwrap(),
        ProcessOutcome::Sent { recipients: 2 }
    );

    let sent = fx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reply_to, None);
    assert!(sent[0].body.contains("ada@shop..com"));
}

#[tokio::test]
async fn test_fallback_address_alone_is_not_a_recipient() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    let pool = db.pool();

    user::create_user(
        pool,
        &User {
            id: "owner-1".to_string(),
            email: None,
            name: "Owner".to_string(),
        },
    )
    .await
    .unwrap();
    site::create_site(
        pool,
        &Site {
            id: "site-1".to_string(),
            name: "Shop".to_string(),
            domain: None,
            owner_id: "owner-1".to_string(),
        },
    )
    .await
    .unwrap();
    site::update_notification_config(
        pool,
        &NotificationConfig {
            email_fallback_enabled: true,
            email_fallback_address: Some("support@example.com".to_string()),
            ..NotificationConfig::disabled("site-1")
        },
    )
    .await
    .unwrap();
    let conversation = chat::create_chat(pool, "site-1", "visitor-1", None).await.unwrap();
    chat::create_message(pool, &conversation.id, Direction::Visitor, "Hello")
        .await
        .unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let processor = FallbackProcessor::new(db.clone(), mailer.clone(), "https://admin.example.com");

    assert_eq!(
        processor.process(&EscalationJob::new("site-1", &conversation.id)).await.unwrap(),
        ProcessOutcome::Skipped(SkipReason::NoRecipients)
    );
    assert!(mailer.sent().is_empty());
}
