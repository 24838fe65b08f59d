//! Slack I/O: Web API client, Events API payloads and Socket Mode.

pub mod slack;
pub mod slack_events;
pub mod socket_mode;

pub use slack::{SlackClient, respond_to_mention, split_message};
pub use slack_events::{AppMention, SlackEvent, SlackPayload, strip_mentions, verify_signature};
