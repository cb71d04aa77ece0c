// Tailoring pipeline and its HTTP handlers.
// The service owns orchestration; handlers only translate HTTP to and from it.

pub mod handlers;
pub mod service;

pub use service::{TailorError, TailorOutcome, TailorService};
