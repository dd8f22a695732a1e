//! Message records and the parser that produces them

pub mod headers;
pub mod parser;
pub mod record;

pub use headers::Headers;
pub use parser::{ParseError, ParsedMessage, parse_message};
pub use record::{
    Attachment, Envelope, MessageId, MessageRecord, MessageSummary, NO_SUBJECT, UNKNOWN_ADDRESS,
};
