pub mod availability;
pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod scheduling;
pub mod token;

pub use availability::AvailabilityCalculator;
pub use booking::AppointmentBookingService;
pub use conflict::ConflictGuard;
pub use lifecycle::{Actor, AppointmentLifecycleService, CustomerAction};
pub use scheduling::SchedulingService;
pub use token::{AlphanumericTokenGenerator, ConfirmationTokenGenerator};
