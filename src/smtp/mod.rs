//! SMTP server implementation

pub mod commands;
pub mod data;
pub mod delivery;
pub mod error;
pub mod response;
pub mod server;
pub mod session;

pub use data::{DataCollector, DataState};
pub use delivery::DeliveryHandler;
pub use error::{SmtpError, SmtpLimits};
pub use response::SmtpResponse;
pub use server::SmtpServer;
pub use session::{SmtpSession, SmtpState};
