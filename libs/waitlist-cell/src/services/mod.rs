pub mod dispatch;
pub mod matching;
pub mod notify;
pub mod waitlist;

pub use dispatch::{dispatcher_from_config, LogDispatch, NotificationDispatch, WebhookDispatch};
pub use matching::WaitlistMatcher;
pub use notify::WaitlistNotifier;
pub use waitlist::WaitlistService;
