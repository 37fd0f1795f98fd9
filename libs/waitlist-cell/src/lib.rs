pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{public_waitlist_routes, waitlist_routes, WaitlistState};
pub use services::*;
