//! Fallback email content.

use std::sync::OnceLock;

use askama::Template;
use regex::Regex;

use crate::error::Result;

/// Name used when the visitor did not give one.
pub const DEFAULT_VISITOR_NAME: &str = "Visitor";

const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";

#[derive(Template)]
#[template(path = "fallback_email.html")]
struct HtmlDigest<'a> {
    site_label: &'a str,
    visitor_name: &'a str,
    messages: &'a [&'a str],
    conversation_url: &'a str,
}

#[derive(Template)]
#[template(path = "fallback_email.txt")]
struct TextDigest<'a> {
    site_label: &'a str,
    visitor_name: &'a str,
    messages: &'a [&'a str],
    conversation_url: &'a str,
}

/// A rendered fallback email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub html: String,
    pub text: String,
    pub reply_to: Option<String>,
}

/// Render the digest of a conversation's unread visitor messages.
pub fn compose(
    site_label: &str,
    visitor_name: &str,
    messages: &[&str],
    conversation_url: &str,
) -> Result<Digest> {
    let html = HtmlDigest {
        site_label,
        visitor_name,
        messages,
        conversation_url,
    }
    .render()?;
    let text = TextDigest {
        site_label,
        visitor_name,
        messages,
        conversation_url,
    }
    .render()?;

    Ok(Digest {
        subject: format!("[ChatIQ] New message from {} on {}", visitor_name, site_label),
        html,
        text,
        reply_to: find_reply_to(messages.iter().copied()),
    })
}

/// First email-looking string across the messages, in order, that the mail
/// transport would accept as an address.
///
/// Not verified beyond syntax.
pub fn find_reply_to<'a>(messages: impl IntoIterator<Item = &'a str>) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()?;

    messages
        .into_iter()
        .flat_map(|text| pattern.find_iter(text))
        .map(|m| m.as_str())
        .find(|candidate| mailer::is_valid_address(candidate))
        .map(str::to_string)
}
