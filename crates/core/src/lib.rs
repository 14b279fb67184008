//! speakeasy-core – Gemeinsame Typen, Ereignisse und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die zwischen der Session-Seite
//! und dem Moderator-Upgrade geteilt werden: Identifikationstypen,
//! Verbindungs- und Raum-Konfiguration sowie die Ereignisse einer
//! Signaling-Verbindung.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, SpeakeasyError};
pub use event::VerbindungsEreignis;
pub use types::{RaumKonfiguration, VerbindungsOptionen, VersuchId};
