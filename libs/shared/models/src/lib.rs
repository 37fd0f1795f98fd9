pub mod auth;
pub mod clock;
pub mod error;
pub mod scheduling;
pub mod tenant;

pub use scheduling::*;
pub use tenant::TenantContext;
