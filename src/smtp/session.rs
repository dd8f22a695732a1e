//! SMTP session state management

use crate::message::Envelope;
use crate::smtp::data::DataCollector;
use crate::smtp::error::SmtpError;

/// Represents the current state of an SMTP session
#[derive(Debug, Clone, PartialEq)]
pub enum SmtpState {
    /// Initial state - waiting for HELO
    Initial,
    /// HELO received - ready for MAIL command
    GreetingReceived,
    /// MAIL FROM received - ready for RCPT commands
    MailReceived,
    /// At least one RCPT TO received - ready for DATA or more RCPT commands
    RecipientsReceived,
    /// DATA command received - collecting email data
    DataMode,
}

/// Manages the state and data for a single SMTP session
#[derive(Debug)]
pub struct SmtpSession {
    /// Current state of the session
    pub state: SmtpState,
    /// Sender address from MAIL FROM command
    pub from: Option<String>,
    /// List of recipients from RCPT TO commands
    pub to: Vec<String>,
    /// Client domain from HELO command
    pub client_domain: Option<String>,
    data: DataCollector,
}

impl SmtpSession {
    /// Create a new SMTP session
    pub fn new() -> Self {
        Self {
            state: SmtpState::Initial,
            from: None,
            to: Vec::new(),
            client_domain: None,
            data: DataCollector::new(),
        }
    }

    /// Reset the session to post-HELO state (clears transaction data)
    pub fn reset(&mut self) {
        self.state = SmtpState::GreetingReceived;
        self.from = None;
        self.to.clear();
        self.data.reset();
        // Keep client_domain as it's set by HELO
    }

    /// Whether DATA content is currently being collected
    pub fn in_data_mode(&self) -> bool {
        self.data.is_receiving()
    }

    /// Set the sender address. An empty address is the null reverse-path.
    pub fn set_sender(&mut self, sender: String) {
        self.from = Some(sender);
        self.to.clear();
        self.data.reset();
        self.state = SmtpState::MailReceived;
    }

    /// Add a recipient address
    pub fn add_recipient(&mut self, recipient: String) {
        self.to.push(recipient);
        self.state = SmtpState::RecipientsReceived;
    }

    /// Start data collection mode
    pub fn start_data_mode(&mut self) -> Result<(), SmtpError> {
        if self.state != SmtpState::RecipientsReceived {
            return Err(SmtpError::InvalidState(
                "DATA command requires RCPT first".to_string(),
            ));
        }

        self.data.begin()?;
        self.state = SmtpState::DataMode;
        Ok(())
    }

    /// Add a chunk of message content during data collection
    pub fn add_data_chunk(&mut self, chunk: &[u8]) -> Result<(), SmtpError> {
        self.data.on_chunk(chunk)
    }

    /// Finish data collection, returning the envelope and the raw message
    pub fn finish_data_collection(&mut self) -> Result<(Envelope, Vec<u8>), SmtpError> {
        if !self.in_data_mode() {
            return Err(SmtpError::InvalidState(
                "Not in data collection mode".to_string(),
            ));
        }

        let mail_from = self
            .from
            .clone()
            .ok_or_else(|| SmtpError::InvalidState("No sender specified".to_string()))?;

        if self.to.is_empty() {
            return Err(SmtpError::InvalidState(
                "No recipients specified".to_string(),
            ));
        }

        let raw = self.data.on_complete()?;
        let envelope = Envelope {
            mail_from,
            rcpt_to: self.to.clone(),
        };

        self.state = SmtpState::GreetingReceived;
        Ok((envelope, raw))
    }

    /// Discard a partially received message
    pub fn abort_data_collection(&mut self) {
        self.data.on_abort();
        self.state = SmtpState::GreetingReceived;
    }

    /// Size of the message content buffered so far
    pub fn current_data_size(&self) -> usize {
        self.data.len()
    }

    /// Set the client domain from HELO command
    pub fn set_client_domain(&mut self, domain: String) {
        self.client_domain = Some(domain);
        self.reset(); // Clear any existing transaction
    }

    /// Check if the session is ready for a specific command
    pub fn can_execute_command(&self, command: &str) -> bool {
        match command.to_uppercase().as_str() {
            "EHLO" | "HELO" => true, // Can be sent at any time
            "MAIL" => self.state == SmtpState::GreetingReceived,
            "RCPT" => {
                self.state == SmtpState::MailReceived || self.state == SmtpState::RecipientsReceived
            }
            "DATA" => self.state == SmtpState::RecipientsReceived,
            "RSET" => self.state != SmtpState::Initial,
            "NOOP" | "QUIT" => true,
            _ => false,
        }
    }
}

impl Default for SmtpSession {
    fn default() -> Self {
        Self::new()
    }
}
