//! HTTP front end for a shared flipcard board.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod server;

pub use config::{Config, ConfigError, ConfigResolved, ServerArgs, ValueSource};
pub use errors::{ApiError, ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use logging::{init_logging, CapturedLog, LogCapture, LogFormat};
pub use middleware::{log_response, with_request_logging};
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
