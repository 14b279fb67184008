//! # speakeasy-observability
//!
//! Structured Logging fuer Speakeasy-Clients via tracing-subscriber
//! (Text- oder JSON-Ausgabe, Filter per Umgebungsvariable).

pub mod logging;

pub use logging::{logging_fuer_tests, logging_initialisieren};
