//! Ereignisse einer Signaling-Verbindung
//!
//! Eine Verbindung meldet ihren Lebenszyklus ueber einen Ereignis-Strom.
//! Die konkrete Transport-Implementierung (TCP, WebSocket, BOSH) liegt
//! ausserhalb dieses Crates und sendet nur diese drei Ereignisse.

use serde::{Deserialize, Serialize};

/// Lebenszyklus-Ereignisse einer Signaling-Verbindung
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "snake_case")]
pub enum VerbindungsEreignis {
    /// Verbindung wurde hergestellt und die Anmeldedaten akzeptiert
    Hergestellt,
    /// Verbindungsaufbau fehlgeschlagen (Transport oder Anmeldung)
    Fehlgeschlagen {
        /// Fehlerbezeichnung des Transports, z.B. `connection.passwordRequired`
        fehler: String,
        /// Menschenlesbare Beschreibung
        nachricht: String,
    },
    /// Verbindung wurde getrennt
    Getrennt,
}

impl VerbindungsEreignis {
    /// Erstellt ein `Fehlgeschlagen`-Ereignis
    pub fn fehlgeschlagen(fehler: impl Into<String>, nachricht: impl Into<String>) -> Self {
        Self::Fehlgeschlagen {
            fehler: fehler.into(),
            nachricht: nachricht.into(),
        }
    }

    /// Kurzname fuer Log-Ausgaben
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hergestellt => "hergestellt",
            Self::Fehlgeschlagen { .. } => "fehlgeschlagen",
            Self::Getrennt => "getrennt",
        }
    }
}
