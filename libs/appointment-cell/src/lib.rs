pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export models and services for the API binary and the chat-booking flow
pub use models::*;
pub use router::{appointment_routes, public_appointment_routes};
pub use services::*;
