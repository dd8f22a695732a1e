//! Implementation of SMTP commands

use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;

/// Handles SMTP commands and returns appropriate responses
#[derive(Debug)]
pub struct SmtpCommandHandler<'a> {
    hostname: &'a str,
}

impl<'a> SmtpCommandHandler<'a> {
    /// Create a new command handler
    pub fn new(hostname: &'a str) -> Self {
        Self { hostname }
    }

    /// Process a command line and return a response
    pub fn process_command(
        &self,
        command_line: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        // Check command line length
        if command_line.len() > SmtpLimits::COMMAND_LINE_MAX_LENGTH {
            return Err(SmtpError::LineTooLong {
                max: SmtpLimits::COMMAND_LINE_MAX_LENGTH,
            });
        }

        let (verb, args) = match command_line.split_once(char::is_whitespace) {
            Some((verb, args)) => (verb, args.trim()),
            None => (command_line, ""),
        };
        if verb.is_empty() {
            return Err(SmtpError::InvalidCommand);
        }

        match verb.to_uppercase().as_str() {
            "HELO" => self.handle_helo(args, session, false),
            "EHLO" => self.handle_helo(args, session, true),
            "MAIL" => self.handle_mail(args, session),
            "RCPT" => self.handle_rcpt(args, session),
            "DATA" => self.handle_data(args, session),
            "RSET" => self.handle_rset(session),
            "NOOP" => Ok(SmtpResponse::ok()),
            "QUIT" => Ok(SmtpResponse::quit()),
            _ => Err(SmtpError::InvalidCommand),
        }
    }

    /// Handle HELO and EHLO commands
    fn handle_helo(
        &self,
        args: &str,
        session: &mut SmtpSession,
        extended: bool,
    ) -> Result<SmtpResponse, SmtpError> {
        let client_domain = args.split_whitespace().next().ok_or_else(|| {
            SmtpError::InvalidSyntax("HELO requires domain argument".to_string())
        })?;

        session.set_client_domain(client_domain.to_string());

        if extended {
            Ok(SmtpResponse::ehlo(self.hostname, client_domain))
        } else {
            Ok(SmtpResponse::helo(self.hostname, client_domain))
        }
    }

    /// Handle MAIL command. Any reverse-path is accepted, including `<>`.
    fn handle_mail(
        &self,
        args: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("MAIL") {
            return Err(SmtpError::InvalidState(
                "MAIL command requires HELO first".to_string(),
            ));
        }

        let addr = parse_path(args, "FROM:").ok_or_else(|| {
            SmtpError::InvalidSyntax("MAIL command must be 'MAIL FROM:<address>'".to_string())
        })?;

        session.set_sender(addr);
        Ok(SmtpResponse::ok())
    }

    /// Handle RCPT command
    fn handle_rcpt(
        &self,
        args: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("RCPT") {
            return Err(SmtpError::InvalidState(
                "RCPT command requires MAIL first".to_string(),
            ));
        }

        let addr = parse_path(args, "TO:").ok_or_else(|| {
            SmtpError::InvalidSyntax("RCPT command must be 'RCPT TO:<address>'".to_string())
        })?;
        if addr.is_empty() {
            return Err(SmtpError::InvalidSyntax(
                "TO address cannot be empty".to_string(),
            ));
        }

        session.add_recipient(addr);
        Ok(SmtpResponse::ok())
    }

    /// Handle DATA command
    fn handle_data(
        &self,
        args: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("DATA") {
            return Err(SmtpError::InvalidState(
                "DATA command requires RCPT first".to_string(),
            ));
        }

        if !args.is_empty() {
            return Err(SmtpError::InvalidSyntax(
                "DATA command takes no arguments".to_string(),
            ));
        }

        session.start_data_mode()?;

        Ok(SmtpResponse::data_start())
    }

    /// Handle RSET command
    fn handle_rset(&self, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("RSET") {
            return Err(SmtpError::InvalidState(
                "RSET command requires HELO first".to_string(),
            ));
        }

        session.reset();
        Ok(SmtpResponse::ok())
    }
}

/// Extract the address from `FROM:<addr> [params]` or `TO:<addr> [params]`.
///
/// The keyword is matched case-insensitively and ESMTP parameters after the
/// path are ignored. Angle brackets are optional.
fn parse_path(args: &str, keyword: &str) -> Option<String> {
    let head = args.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }

    let path = args[keyword.len()..].trim_start();
    if let Some(rest) = path.strip_prefix('<') {
        let end = rest.find('>')?;
        Some(rest[..end].trim().to_string())
    } else {
        path.split_whitespace().next().map(str::to_string)
    }
}
