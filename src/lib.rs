pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod projection;
pub mod service;

// Re-export main types for convenience
pub use error::{DeliveryError, ServiceError, ServiceResult};
pub use models::*;
pub use service::{MessageService, MockMessageService, ServiceEvent};
