//! SMTP response handling

use crate::message::MessageId;

/// Represents an SMTP response that can be sent to a client
#[derive(Debug, Clone)]
pub struct SmtpResponse {
    /// The SMTP response code (e.g., "250", "354", "500")
    pub code: String,
    /// The human-readable message
    pub message: String,
    /// Optional multiline messages for EHLO responses
    pub multiline: Option<Vec<String>>,
}

impl SmtpResponse {
    /// Create a new SMTP response
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            multiline: None,
        }
    }

    /// Create a new multiline SMTP response
    pub fn new_multiline(code: &str, message: &str, lines: Vec<String>) -> Self {
        Self {
            code: code.to_owned(),
            message: message.to_owned(),
            multiline: Some(lines),
        }
    }

    /// Create a success response (250 OK)
    pub fn ok() -> Self {
        Self::new("250", "OK")
    }

    /// Create a greeting response (220)
    pub fn greeting(hostname: &str) -> Self {
        Self::new("220", &format!("{hostname} ESMTP mailsink ready"))
    }

    /// Create a HELO response (250)
    pub fn helo(hostname: &str, client_domain: &str) -> Self {
        Self::new("250", &format!("{hostname} Hello {client_domain}"))
    }

    /// Create an EHLO response (250) with capabilities
    pub fn ehlo(hostname: &str, client_domain: &str) -> Self {
        let capabilities = vec!["8BITMIME".to_owned(), "PIPELINING".to_owned()];
        Self::new_multiline(
            "250",
            &format!("{hostname} Hello {client_domain}"),
            capabilities,
        )
    }

    /// Create a DATA intermediate response (354)
    pub fn data_start() -> Self {
        Self::new("354", "End data with <CR><LF>.<CR><LF>")
    }

    /// Create the response for an accepted message (250)
    pub fn queued(id: &MessageId) -> Self {
        Self::new("250", &format!("OK: queued as {id}"))
    }

    /// Create a QUIT response (221)
    pub fn quit() -> Self {
        Self::new("221", "Bye")
    }

    /// Create an error response from an error
    pub fn error(code: &str, message: &str) -> Self {
        Self::new(code, message)
    }

    /// Format the response for sending over the wire.
    ///
    /// Multi-line replies use `code-` on every line but the last.
    pub fn format(&self) -> String {
        let Some(lines) = &self.multiline else {
            return format!("{} {}\r\n", self.code, self.message);
        };

        let mut out = String::new();
        let all = std::iter::once(self.message.as_str()).chain(lines.iter().map(String::as_str));
        let count = lines.len() + 1;
        for (i, line) in all.enumerate() {
            let sep = if i + 1 == count { ' ' } else { '-' };
            out.push_str(&self.code);
            out.push(sep);
            out.push_str(line);
            out.push_str("\r\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response() {
        let response = SmtpResponse::ok();
        assert_eq!(response.code, "250");
        assert_eq!(response.message, "OK");
    }

    #[test]
    fn test_greeting_response() {
        let response = SmtpResponse::greeting("sink.local");
        assert_eq!(response.code, "220");
        assert_eq!(response.message, "sink.local ESMTP mailsink ready");
    }

    #[test]
    fn test_helo_response() {
        let response = SmtpResponse::helo("server.local", "client.local");
        assert_eq!(response.code, "250");
        assert_eq!(response.message, "server.local Hello client.local");
    }

    #[test]
    fn test_ehlo_response() {
        let response = SmtpResponse::ehlo("server.local", "client.local");
        let formatted = response.format();

        assert_eq!(
            formatted,
            "250-server.local Hello client.local\r\n250-8BITMIME\r\n250 PIPELINING\r\n"
        );
    }

    #[test]
    fn test_queued_response() {
        let id = MessageId::new();
        let response = SmtpResponse::queued(&id);
        assert_eq!(response.code, "250");
        assert_eq!(response.message, format!("OK: queued as {id}"));
    }

    #[test]
    fn test_format() {
        assert_eq!(SmtpResponse::ok().format(), "250 OK\r\n");
        assert_eq!(SmtpResponse::quit().format(), "221 Bye\r\n");
    }
}
