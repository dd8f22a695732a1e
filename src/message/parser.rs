//! Raw message parsing built on `mail-parser`

use mail_parser::{Address, MessageParser, MimeHeaders, PartType};
use thiserror::Error;

use crate::message::headers::Headers;
use crate::message::record::Attachment;

/// Reasons a raw message cannot be turned into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("message is empty")]
    Empty,

    #[error("message could not be decoded")]
    Malformed,
}

/// Fields extracted from a raw message, before an id and timestamp are assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub text: String,
    pub html: String,
    pub headers: Headers,
    pub attachments: Vec<Attachment>,
    /// Size of the raw input in bytes
    pub size: usize,
}

/// Parse a complete raw message (headers + body).
///
/// Only the first plain and first HTML body part are kept. When a message has
/// just one of the two forms, the other is left empty. A message without a
/// header block is accepted and yields no header fields.
pub fn parse_message(raw: &[u8]) -> Result<ParsedMessage, ParseError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    let parser = MessageParser::default();
    let framed: Vec<u8>;
    let message = match parser.parse(raw) {
        Some(message) => message,
        None => {
            // No header block at all: the whole input is body
            framed = [b"\r\n".as_slice(), raw].concat();
            parser
                .parse(framed.as_slice())
                .ok_or(ParseError::Malformed)?
        }
    };

    // The header block is exactly what mail-parser consumed as headers
    let root = message.root_part();
    let header_block = message
        .raw_message
        .get(root.raw_header_offset()..root.raw_body_offset())
        .unwrap_or_default();
    let headers = Headers::parse(&String::from_utf8_lossy(header_block));

    let text = match message.text_part(0).map(|part| &part.body) {
        Some(PartType::Text(text)) => text.to_string(),
        _ => String::new(),
    };
    let html = match message.html_part(0).map(|part| &part.body) {
        Some(PartType::Html(html)) => html.to_string(),
        _ => String::new(),
    };

    Ok(ParsedMessage {
        from: render_addresses(message.from()),
        to: render_addresses(message.to()),
        subject: message.subject().map(str::to_owned),
        text,
        html,
        headers,
        attachments: collect_attachments(&message),
        size: raw.len(),
    })
}

/// Render an address header as `Name <addr>` entries joined by `, `
fn render_addresses(address: Option<&Address<'_>>) -> Option<String> {
    let rendered: Vec<String> = address?
        .iter()
        .filter_map(|addr| match (addr.name(), addr.address()) {
            (Some(name), Some(email)) => Some(format!("{name} <{email}>")),
            (None, Some(email)) => Some(email.to_owned()),
            (Some(name), None) => Some(name.to_owned()),
            (None, None) => None,
        })
        .collect();

    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join(", "))
    }
}

fn collect_attachments(message: &mail_parser::Message<'_>) -> Vec<Attachment> {
    message
        .attachments()
        .enumerate()
        .map(|(idx, part)| {
            let filename = part
                .attachment_name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("attachment-{}", idx + 1));

            let content_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{sub}", ct.ctype()),
                    None => ct.ctype().to_owned(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_owned());

            let content = part.contents().to_vec();
            Attachment {
                filename,
                content_type,
                size: content.len(),
                content,
            }
        })
        .collect()
}
