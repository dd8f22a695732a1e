//! DATA phase accumulation
//!
//! [`DataCollector`] buffers the message content of one transaction. It knows
//! nothing about sockets or threads: the connection loop feeds it chunks and
//! tells it when the peer finished or went away.

use crate::smtp::error::SmtpError;

/// Lifecycle of a single DATA phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    /// No DATA phase in progress
    Idle,
    /// Chunks are being buffered
    Receiving,
    /// The end marker was seen and the buffer was handed off
    Complete,
    /// The transport went away mid-phase; the buffer was dropped
    Aborted,
}

/// One line of the DATA phase, after transparency handling
#[derive(Debug, PartialEq, Eq)]
pub enum DataLine<'a> {
    /// The `.` line that ends the message
    End,
    /// Message content, line ending included
    Content(&'a [u8]),
}

/// Classify a raw DATA line and undo dot-stuffing (RFC 5321 4.5.2)
pub fn classify_data_line(line: &[u8]) -> DataLine<'_> {
    let content = line
        .strip_suffix(b"\n")
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .unwrap_or(line);

    if content == b"." {
        DataLine::End
    } else if line.starts_with(b"..") {
        DataLine::Content(&line[1..])
    } else {
        DataLine::Content(line)
    }
}

#[derive(Debug)]
pub struct DataCollector {
    state: DataState,
    buffer: Vec<u8>,
}

impl DataCollector {
    pub fn new() -> Self {
        Self {
            state: DataState::Idle,
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> DataState {
        self.state
    }

    pub fn is_receiving(&self) -> bool {
        self.state == DataState::Receiving
    }

    /// Bytes buffered so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Enter the receiving state with an empty buffer
    pub fn begin(&mut self) -> Result<(), SmtpError> {
        if self.is_receiving() {
            return Err(SmtpError::InvalidState(
                "Already receiving message data".to_string(),
            ));
        }

        self.buffer.clear();
        self.state = DataState::Receiving;
        Ok(())
    }

    /// Append a chunk in arrival order
    pub fn on_chunk(&mut self, chunk: &[u8]) -> Result<(), SmtpError> {
        if !self.is_receiving() {
            return Err(SmtpError::InvalidState(
                "Not in data collection mode".to_string(),
            ));
        }

        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Finish the phase and take the buffered message.
    ///
    /// The line break directly before the end marker belongs to the marker
    /// and is not part of the returned message.
    pub fn on_complete(&mut self) -> Result<Vec<u8>, SmtpError> {
        if !self.is_receiving() {
            return Err(SmtpError::InvalidState(
                "Not in data collection mode".to_string(),
            ));
        }

        let mut message = std::mem::take(&mut self.buffer);
        if message.ends_with(b"\r\n") {
            message.truncate(message.len() - 2);
        } else if message.ends_with(b"\n") {
            message.truncate(message.len() - 1);
        }

        self.state = DataState::Complete;
        Ok(message)
    }

    /// Drop whatever was buffered
    pub fn on_abort(&mut self) {
        self.buffer = Vec::new();
        self.state = DataState::Aborted;
    }

    /// Return to idle, discarding any buffer
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DataState::Idle;
    }
}

impl Default for DataCollector {
    fn default() -> Self {
        Self::new()
    }
}
