// pantry/src/services/mod.rs

//! Collaborators the lifecycle depends on but does not implement: the payment
//! gateway, the notification channel and the clock.

pub mod clock;
pub mod notify;
pub mod payment;

pub use clock::{Clock, ManualClock, SystemClock};
pub use notify::{templates, NotificationDispatcher, Notifier};
pub use payment::{GatewayError, PaymentGateway};
