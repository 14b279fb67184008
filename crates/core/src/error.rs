//! Fehlertypen fuer Speakeasy
//!
//! Zentraler Fehler-Enum fuer Aufrufer, die mehrere Speakeasy-Crates
//! kombinieren. Untermodule definieren eigene Fehler und konvertieren
//! via `From` in diesen Typ.

use thiserror::Error;

/// Globaler Result-Alias fuer Speakeasy
pub type Result<T> = std::result::Result<T, SpeakeasyError>;

/// Alle moeglichen Fehler im Speakeasy-System
#[derive(Debug, Error)]
pub enum SpeakeasyError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen ({fehler}): {nachricht}")]
    Verbindung { fehler: String, nachricht: String },

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Authentifizierung ---
    #[error("Authentifizierung fehlgeschlagen ({fehler}): {nachricht}")]
    Authentifizierung { fehler: String, nachricht: String },

    /// Vom Benutzer abgebrochen, kein echter Fehler
    #[error("Vorgang abgebrochen")]
    Abgebrochen,

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SpeakeasyError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Erstellt einen Konfigurationsfehler
    pub fn konfiguration(msg: impl Into<String>) -> Self {
        Self::Konfiguration(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler durch einen Benutzer-Abbruch entstand
    ///
    /// Aufrufer sollten in diesem Fall keine Fehlermeldung anzeigen.
    pub fn ist_abbruch(&self) -> bool {
        matches!(self, Self::Abgebrochen)
    }
}
