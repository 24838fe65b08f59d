//! Slack Events API payloads and request signing.

use std::sync::LazyLock;

use hmac::{Hmac, Mac};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::ChannelError;

/// Requests older than this are treated as replays.
pub const MAX_REQUEST_AGE_SECS: i64 = 60 * 5;

static LEADING_MENTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\s*<@[A-Z0-9]+(?:\|[^>]*)?>)+\s*").expect("valid regex"));

/// Top-level body of an Events API request (or a Socket Mode `events_api`
/// payload).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackPayload {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event: SlackEvent,
        #[serde(default)]
        event_id: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    AppMention(AppMention),
    #[serde(other)]
    Unsupported,
}

/// Someone mentioned the bot in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppMention {
    #[serde(default)]
    pub text: String,
    pub channel: String,
    pub ts: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

impl AppMention {
    /// Thread to answer in: the existing thread, or one started on the mention.
    pub fn reply_thread(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }

    /// `<@U123>` for the author, or a neutral fallback.
    pub fn user_mention(&self) -> String {
        match &self.user {
            Some(user) => format!("<@{user}>"),
            None => "there".to_string(),
        }
    }

    /// Mention text without the leading bot mention(s).
    pub fn question(&self) -> String {
        strip_mentions(&self.text)
    }
}

/// Remove leading `<@U...>` tokens and surrounding whitespace.
pub fn strip_mentions(text: &str) -> String {
    LEADING_MENTIONS.replace(text, "").trim().to_string()
}

/// Check `X-Slack-Signature` against `v0:{timestamp}:{body}` signed with
/// the app's signing secret.
pub fn verify_signature(
    signing_secret: &SecretString,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now_unix: i64,
) -> Result<(), ChannelError> {
    let auth_err = |reason: &str| ChannelError::AuthFailed {
        name: "slack".to_string(),
        reason: reason.to_string(),
    };

    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| auth_err("invalid request timestamp"))?;
    let age = now_unix.checked_sub(sent_at).map(i64::unsigned_abs);
    if age.is_none_or(|age| age > MAX_REQUEST_AGE_SECS as u64) {
        return Err(auth_err("request timestamp outside the replay window"));
    }

    let expected = signature
        .strip_prefix("v0=")
        .and_then(decode_hex)
        .ok_or_else(|| auth_err("malformed signature"))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(signing_secret.expose_secret().as_bytes())
        .map_err(|_| auth_err("unusable signing secret"))?;
    mac.update(b"v0:");
    mac.update(timestamp.trim().as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| auth_err("signature mismatch"))
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}
