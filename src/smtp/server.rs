//! SMTP server implementation

use crate::smtp::commands::SmtpCommandHandler;
use crate::smtp::data::{DataLine, classify_data_line};
use crate::smtp::delivery::DeliveryHandler;
use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;
use crate::store::HistoryStore;

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

/// SMTP server that accepts every message and records it in a [`HistoryStore`]
#[derive(Debug, Clone)]
pub struct SmtpServer {
    /// Server hostname
    hostname: String,
    delivery: DeliveryHandler,
}

impl SmtpServer {
    /// Create a new SMTP server writing into `store`
    pub fn new(hostname: &str, store: Arc<HistoryStore>) -> Self {
        Self {
            hostname: hostname.to_owned(),
            delivery: DeliveryHandler::new(store),
        }
    }

    /// Start the server on the specified address (blocking)
    pub fn start(&self, addr: &str) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(addr)?;
        self.start_with_listener(listener)
    }

    /// Start the server with an existing listener (blocking).
    ///
    /// Each connection is served on its own thread.
    pub fn start_with_listener(&self, listener: TcpListener) -> Result<(), SmtpError> {
        info!(addr = %listener.local_addr()?, "SMTP server listening");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = self.clone();
                    thread::spawn(move || {
                        let peer = stream.peer_addr().ok();
                        debug!(?peer, "New connection");
                        if let Err(e) = server.handle_client(stream) {
                            warn!(?peer, error = %e, "Error handling client");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Error accepting connection");
                }
            }
        }

        Ok(())
    }

    /// Handle a client connection
    fn handle_client(&self, mut stream: TcpStream) -> Result<(), SmtpError> {
        let command_handler = SmtpCommandHandler::new(&self.hostname);
        let mut session = SmtpSession::new();
        let mut reader = BufReader::new(stream.try_clone()?);

        // Send greeting
        self.send_response(&mut stream, &SmtpResponse::greeting(&self.hostname))?;

        let mut line_buffer = Vec::new();
        loop {
            line_buffer.clear();

            match reader.read_until(b'\n', &mut line_buffer) {
                Ok(0) => {
                    if session.in_data_mode() {
                        debug!(
                            size = session.current_data_size(),
                            "Connection closed during DATA, discarding message"
                        );
                        session.abort_data_collection();
                    }
                    break; // Connection closed
                }
                Ok(_) => {
                    if session.in_data_mode() {
                        // Message content is kept byte-exact
                        if let Some(response) = self.handle_data_line(&line_buffer, &mut session)
                        {
                            self.send_response(&mut stream, &response)?;
                        }
                        continue;
                    }

                    let line = String::from_utf8_lossy(&line_buffer);
                    let command = line.trim();
                    if command.is_empty() {
                        continue;
                    }

                    match command_handler.process_command(command, &mut session) {
                        Ok(response) => {
                            self.send_response(&mut stream, &response)?;
                            if response.code == "221" {
                                break; // QUIT command
                            }
                        }
                        Err(e) => {
                            let response =
                                SmtpResponse::error(e.to_response_code(), &e.to_response_message());
                            self.send_response(&mut stream, &response)?;
                        }
                    }
                }
                Err(e) => {
                    if session.in_data_mode() {
                        session.abort_data_collection();
                    }
                    return Err(SmtpError::Io(e));
                }
            }
        }

        Ok(())
    }

    /// Handle a line of data during DATA mode.
    ///
    /// Returns the transaction reply once the end marker arrives.
    fn handle_data_line(&self, line: &[u8], session: &mut SmtpSession) -> Option<SmtpResponse> {
        let result = match classify_data_line(line) {
            DataLine::Content(chunk) => match session.add_data_chunk(chunk) {
                Ok(()) => return None,
                Err(e) => Err(e),
            },
            DataLine::End => self.complete_transaction(session),
        };

        session.reset();
        Some(match result {
            Ok(response) => response,
            Err(e) => SmtpResponse::error(e.to_response_code(), &e.to_response_message()),
        })
    }

    fn complete_transaction(&self, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        let (envelope, raw) = session.finish_data_collection()?;
        let record = self.delivery.deliver(envelope, &raw)?;
        Ok(SmtpResponse::queued(&record.id))
    }

    /// Send a response to the client
    fn send_response(
        &self,
        stream: &mut TcpStream,
        response: &SmtpResponse,
    ) -> Result<(), SmtpError> {
        // Ensure response doesn't exceed maximum line length
        let formatted = response.format();
        if formatted.len() > SmtpLimits::REPLY_LINE_MAX_LENGTH {
            // Truncate message if too long
            let truncated_response =
                SmtpResponse::new(&response.code, "Response too long (truncated)");
            stream.write_all(truncated_response.format().as_bytes())?;
        } else {
            stream.write_all(formatted.as_bytes())?;
        }
        stream.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn start_test_server(capacity: usize) -> (String, Arc<HistoryStore>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let store = Arc::new(HistoryStore::new(capacity));
        let server = SmtpServer::new("test.local", Arc::clone(&store));

        // Start server in background thread
        thread::spawn(move || server.start_with_listener(listener));

        (addr, store)
    }

    fn connect(addr: &str) -> (TcpStream, BufReader<TcpStream>) {
        let stream = TcpStream::connect(addr).unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut greeting = String::new();
        reader.read_line(&mut greeting).unwrap();
        assert!(greeting.starts_with("220"));
        (stream, reader)
    }

    fn send_command(
        stream: &mut TcpStream,
        reader: &mut BufReader<TcpStream>,
        command: &str,
    ) -> String {
        write!(stream, "{command}\r\n").unwrap();
        stream.flush().unwrap();

        let mut response = String::new();
        reader.read_line(&mut response).unwrap();
        response.trim().to_string()
    }

    fn wait_for_len(store: &HistoryStore, len: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while store.len() < len && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_server_creation() {
        let server = SmtpServer::new("test.local", Arc::new(HistoryStore::new(1)));
        assert_eq!(server.hostname, "test.local");
    }

    #[test]
    fn test_complete_smtp_session() {
        let (addr, store) = start_test_server(10);
        let (mut stream, mut reader) = connect(&addr);

        assert!(send_command(&mut stream, &mut reader, "HELO client.local").starts_with("250"));
        assert!(
            send_command(&mut stream, &mut reader, "MAIL FROM:<test@example.com>")
                .starts_with("250")
        );
        assert!(
            send_command(&mut stream, &mut reader, "RCPT TO:<recipient@example.com>")
                .starts_with("250")
        );
        assert!(send_command(&mut stream, &mut reader, "DATA").starts_with("354"));

        write!(stream, "Subject: Test Email\r\n\r\nThis is a test email.\r\n..dotted\r\n").unwrap();
        let response = send_command(&mut stream, &mut reader, ".");
        assert!(response.starts_with("250 OK: queued as "));

        assert!(send_command(&mut stream, &mut reader, "QUIT").starts_with("221"));

        let page = store.list(0, 1);
        let record = &page.messages[0];
        assert!(response.ends_with(&record.id.to_string()));
        assert_eq!(record.subject, "Test Email");
        assert!(record.text.starts_with("This is a test email."));
        assert!(record.text.ends_with("\n.dotted"));
        assert_eq!(record.envelope.mail_from, "test@example.com");
        assert_eq!(record.envelope.rcpt_to, vec!["recipient@example.com"]);
    }

    #[test]
    fn test_error_handling() {
        let (addr, _store) = start_test_server(10);
        let (mut stream, mut reader) = connect(&addr);

        assert!(send_command(&mut stream, &mut reader, "INVALID").starts_with("500"));
        assert!(
            send_command(&mut stream, &mut reader, "MAIL FROM:<test@example.com>")
                .starts_with("503")
        );
        assert!(send_command(&mut stream, &mut reader, "QUIT").starts_with("221"));
    }

    #[test]
    fn test_empty_message_is_rejected() {
        let (addr, store) = start_test_server(10);
        let (mut stream, mut reader) = connect(&addr);

        send_command(&mut stream, &mut reader, "HELO client.local");
        send_command(&mut stream, &mut reader, "MAIL FROM:<a@x.com>");
        send_command(&mut stream, &mut reader, "RCPT TO:<b@y.com>");
        send_command(&mut stream, &mut reader, "DATA");
        // An empty message cannot be parsed
        let response = send_command(&mut stream, &mut reader, ".");

        assert_eq!(response, "554 Transaction failed");
        assert!(store.is_empty());

        // The session keeps working
        send_command(&mut stream, &mut reader, "MAIL FROM:<a@x.com>");
        send_command(&mut stream, &mut reader, "RCPT TO:<b@y.com>");
        send_command(&mut stream, &mut reader, "DATA");
        write!(stream, "Subject: fine\r\n\r\nok\r\n").unwrap();
        assert!(send_command(&mut stream, &mut reader, ".").starts_with("250"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_disconnect_during_data_discards_message() {
        let (addr, store) = start_test_server(10);
        {
            let (mut stream, mut reader) = connect(&addr);
            send_command(&mut stream, &mut reader, "HELO client.local");
            send_command(&mut stream, &mut reader, "MAIL FROM:<a@x.com>");
            send_command(&mut stream, &mut reader, "RCPT TO:<b@y.com>");
            send_command(&mut stream, &mut reader, "DATA");
            write!(stream, "Subject: never finished\r\n").unwrap();
            stream.flush().unwrap();
        }

        // A later session still works and is the only one stored
        let (mut stream, mut reader) = connect(&addr);
        send_command(&mut stream, &mut reader, "HELO client.local");
        send_command(&mut stream, &mut reader, "MAIL FROM:<a@x.com>");
        send_command(&mut stream, &mut reader, "RCPT TO:<b@y.com>");
        send_command(&mut stream, &mut reader, "DATA");
        write!(stream, "Subject: finished\r\n\r\nbody\r\n").unwrap();
        assert!(send_command(&mut stream, &mut reader, ".").starts_with("250"));

        wait_for_len(&store, 1);
        let page = store.list(0, 10);
        assert_eq!(page.total, 1);
        assert_eq!(page.messages[0].subject, "finished");
    }

    #[test]
    fn test_concurrent_connections_are_served() {
        let (addr, store) = start_test_server(10);

        // Hold one connection open mid-transaction while another completes
        let (mut idle, mut idle_reader) = connect(&addr);
        send_command(&mut idle, &mut idle_reader, "HELO idle.local");

        let (mut stream, mut reader) = connect(&addr);
        send_command(&mut stream, &mut reader, "HELO client.local");
        send_command(&mut stream, &mut reader, "MAIL FROM:<a@x.com>");
        send_command(&mut stream, &mut reader, "RCPT TO:<b@y.com>");
        send_command(&mut stream, &mut reader, "DATA");
        write!(stream, "Subject: parallel\r\n\r\nbody\r\n").unwrap();
        assert!(send_command(&mut stream, &mut reader, ".").starts_with("250"));

        assert!(send_command(&mut idle, &mut idle_reader, "NOOP").starts_with("250"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rset_command() {
        let (addr, store) = start_test_server(10);
        let (mut stream, mut reader) = connect(&addr);

        send_command(&mut stream, &mut reader, "HELO client.local");
        send_command(&mut stream, &mut reader, "MAIL FROM:<sender@example.com>");
        send_command(&mut stream, &mut reader, "RCPT TO:<recipient@example.com>");
        assert!(send_command(&mut stream, &mut reader, "RSET").starts_with("250"));

        send_command(&mut stream, &mut reader, "MAIL FROM:<newsender@example.com>");
        send_command(&mut stream, &mut reader, "RCPT TO:<newrecipient@example.com>");
        send_command(&mut stream, &mut reader, "DATA");
        write!(stream, "Subject: After Reset\r\n\r\nThis message came after RSET\r\n").unwrap();
        assert!(send_command(&mut stream, &mut reader, ".").starts_with("250"));

        let page = store.list(0, 10);
        assert_eq!(page.total, 1);
        assert_eq!(page.messages[0].envelope.mail_from, "newsender@example.com");
        assert_eq!(
            page.messages[0].envelope.rcpt_to,
            vec!["newrecipient@example.com"]
        );
    }
}
