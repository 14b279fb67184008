//! Gemeinsame Typen fuer Speakeasy
//!
//! IDs verwenden das Newtype-Pattern um Verwechslungen zur Compilezeit
//! auszuschliessen. Verbindungs- und Raum-Konfiguration sind fuer dieses
//! Crate weitgehend opak und werden nur durchgereicht.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Eindeutige ID eines Upgrade-Versuchs (fuer Logs und Tracing-Spans)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersuchId(pub Uuid);

impl VersuchId {
    /// Erstellt eine neue zufaellige VersuchId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for VersuchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VersuchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "versuch:{}", self.0)
    }
}

/// Transport-Optionen einer Signaling-Verbindung
///
/// Die Zweitverbindung eines Upgrades wird mit denselben Optionen gebaut
/// wie die Hauptverbindung der Session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerbindungsOptionen {
    /// Endpunkt des Signaling-Dienstes (z.B. `wss://meet.example.org/xmpp-websocket`)
    pub service_url: String,
    /// Anmelde-Domain (leer = Domain des Endpunkts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Weitere transport-spezifische Optionen
    #[serde(flatten)]
    pub zusatz: Map<String, Value>,
}

impl VerbindungsOptionen {
    /// Erstellt Optionen nur mit Endpunkt
    pub fn neu(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            ..Self::default()
        }
    }
}

/// Opake Raum-Konfiguration der Konferenz
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaumKonfiguration(pub Map<String, Value>);

impl RaumKonfiguration {
    /// Gibt einen einzelnen Konfigurationswert zurueck
    pub fn wert(&self, schluessel: &str) -> Option<&Value> {
        self.0.get(schluessel)
    }
}
