//! Structured message records kept by the history store

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::message::headers::Headers;
use crate::message::parser::ParsedMessage;

/// Address used when a message carries no `From` or `To` header
pub const UNKNOWN_ADDRESS: &str = "unknown@example.com";

/// Subject used when a message carries no `Subject` header
pub const NO_SUBJECT: &str = "No Subject";

/// Opaque identifier assigned to every accepted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// SMTP envelope of the transaction that delivered a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Reverse-path from `MAIL FROM` (empty for the null sender)
    pub mail_from: String,
    /// Forward-paths from every `RCPT TO`
    pub rcpt_to: Vec<String>,
}

/// A decoded attachment part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    /// Decoded size in bytes
    pub size: usize,
    #[serde(serialize_with = "serialize_base64")]
    pub content: Vec<u8>,
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

/// A message accepted by the SMTP server.
///
/// Records are built once at the end of a successful transaction and shared
/// read-only from then on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: MessageId,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    /// When the server finished receiving the message
    pub received_at: DateTime<Utc>,
    pub headers: Headers,
    pub attachments: Vec<Attachment>,
    pub envelope: Envelope,
    /// Size of the raw message in bytes
    pub size: usize,
}

impl MessageRecord {
    /// Build a record from parser output, assigning a fresh id
    pub fn new(parsed: ParsedMessage, envelope: Envelope, received_at: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            from: parsed.from.unwrap_or_else(|| UNKNOWN_ADDRESS.to_owned()),
            to: parsed.to.unwrap_or_else(|| UNKNOWN_ADDRESS.to_owned()),
            subject: parsed.subject.unwrap_or_else(|| NO_SUBJECT.to_owned()),
            text: parsed.text,
            html: parsed.html,
            received_at,
            headers: parsed.headers,
            attachments: parsed.attachments,
            envelope,
            size: parsed.size,
        }
    }

    /// Cheap projection used by status queries
    pub fn summary(&self) -> MessageSummary {
        MessageSummary {
            id: self.id,
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.subject.clone(),
            received_at: self.received_at,
        }
    }
}

/// Summary fields of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: MessageId,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub received_at: DateTime<Utc>,
}
