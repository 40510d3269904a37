pub mod push_payment;
pub mod recorder;

pub use push_payment::{PushOutcome, PushPaymentRequest, PushPaymentService, PushRegistry};
pub use recorder::{PaymentRecorder, ReconcileOutcome, RecordedPayment};
