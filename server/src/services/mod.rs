// pantry_admin/src/services/mod.rs

pub mod email_mock;
pub mod payment_mock;

pub use email_mock::MockEmailNotifier;
pub use payment_mock::MockPaymentGateway;
