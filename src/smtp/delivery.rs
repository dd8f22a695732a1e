//! Turning completed transactions into stored records

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::message::{Envelope, MessageRecord, ParseError, parse_message};
use crate::store::HistoryStore;

/// Parses completed DATA buffers and publishes them to the history store.
///
/// Cloning is cheap; every connection thread gets its own handle to the same
/// store.
#[derive(Debug, Clone)]
pub struct DeliveryHandler {
    store: Arc<HistoryStore>,
}

impl DeliveryHandler {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// Parse and store one message.
    ///
    /// Nothing is inserted when parsing fails.
    pub fn deliver(
        &self,
        envelope: Envelope,
        raw: &[u8],
    ) -> Result<Arc<MessageRecord>, ParseError> {
        let parsed = match parse_message(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    error = %e,
                    from = %envelope.mail_from,
                    size = raw.len(),
                    "Rejected message"
                );
                return Err(e);
            }
        };

        let record = self
            .store
            .insert(MessageRecord::new(parsed, envelope, Utc::now()));

        info!(
            id = %record.id,
            subject = %record.subject,
            from = %record.from,
            to = %record.to,
            "Email received"
        );
        Ok(record)
    }
}
