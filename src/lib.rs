//! # mailsink
//!
//! mailsink is a development mail sink.
//!
//! It accepts every message delivered over SMTP, parses it and keeps the
//! most recent ones in memory, where they can be inspected through a small
//! JSON API. Code that sends email can be tested against a real transport
//! without delivering anything.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mailsink::{HistoryStore, SmtpServer};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let store = Arc::new(HistoryStore::new(100));
//! let server = SmtpServer::new("test.local", Arc::clone(&store));
//!
//! thread::spawn(move || {
//!     server.start("127.0.0.1:2525").unwrap();
//! });
//!
//! // Application sends email to localhost:2525
//! // ...
//!
//! for record in store.list(0, 10).messages {
//!     println!("{} from {}: {}", record.id, record.from, record.subject);
//! }
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `HELO` / `EHLO` - Identify the sender
//! - `MAIL FROM` - Specify the sender's address
//! - `RCPT TO` - Specify the destination (multiple destinations are supported)
//! - `DATA` - Send the message
//! - `RSET` - Reset the current transaction
//! - `NOOP` - Do nothing
//! - `QUIT` - Close connection
//!
//! ## HTTP API
//!
//! [`api::router`] exposes the store:
//!
//! - `GET /health` - Liveness and counters
//! - `GET /api/emails?offset=&limit=` - Newest first page of messages
//! - `GET /api/emails/{id}` / `DELETE /api/emails/{id}` - Single message
//! - `DELETE /api/emails` - Clear the history
//! - `GET /api/stats` - Counters and recent summaries
//! - `GET /` - HTML status page
//!
//! ## Notes
//!
//! - Runs in-memory only. History is lost on restart.
//! - Every sender and recipient is accepted. Nothing is relayed.
//! - SMTP authentication and TLS are not supported.
//! - A message that cannot be parsed is rejected with `554` and the
//!   connection stays usable.

pub mod api;
pub mod config;
pub mod message;
pub mod smtp;
pub mod store;

pub use message::{MessageId, MessageRecord, ParseError, parse_message};
pub use smtp::{SmtpError, SmtpLimits, SmtpResponse, SmtpServer, SmtpSession, SmtpState};
pub use store::{HistoryStore, Stats, StoreError};
