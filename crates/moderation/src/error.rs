//! Fehlertypen fuer das Moderator-Upgrade
//!
//! Ein Upgrade endet mit genau einem Ausgang: Erfolg, Verbindungsfehler,
//! Ablehnung durch die Session-Autoritaet oder Abbruch. Zeitlimit und
//! fehlende Runtime kommen nur bei entsprechender Konfiguration bzw.
//! falschem Aufruf vor.
//! Der Abbruch ist kein echter Fehler und muss vom Aufrufer gesondert
//! behandelt werden (keine Fehlermeldung anzeigen).

use serde::{Deserialize, Serialize};
use speakeasy_core::SpeakeasyError;
use thiserror::Error;

/// Ablehnung der Moderator-Authentifizierung durch die Session-Autoritaet
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{fehler}: {nachricht}")]
pub struct AutoritaetsAblehnung {
    /// Fehlerbedingung aus dem Vokabular der Autoritaet, z.B. `not-authorized`
    pub fehler: String,
    /// Menschenlesbare Beschreibung
    pub nachricht: String,
}

impl AutoritaetsAblehnung {
    pub fn neu(fehler: impl Into<String>, nachricht: impl Into<String>) -> Self {
        Self {
            fehler: fehler.into(),
            nachricht: nachricht.into(),
        }
    }
}

/// Fehlgeschlagener Ausgang eines Upgrade-Versuchs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeFehler {
    /// Zweitverbindung konnte nicht hergestellt werden
    #[error("Verbindung fehlgeschlagen ({fehler}): {nachricht}")]
    Verbindung { fehler: String, nachricht: String },

    /// Session-Autoritaet hat die Moderator-Authentifizierung abgelehnt
    #[error("Authentifizierung abgelehnt ({fehler}): {nachricht}")]
    Authentifizierung { fehler: String, nachricht: String },

    /// Vom Benutzer abgebrochen
    #[error("Upgrade abgebrochen")]
    Abgebrochen,

    /// Konfiguriertes Zeitlimit ohne Abschluss verstrichen
    #[error("Upgrade nach {nach_ms} ms ohne Ergebnis beendet")]
    Zeitlimit { nach_ms: u64 },

    /// Aufruf ausserhalb einer tokio-Runtime, es wurde nichts gestartet
    #[error("Keine tokio-Runtime verfuegbar")]
    KeineLaufzeit,
}

impl UpgradeFehler {
    /// Gibt true zurueck wenn der Versuch vom Benutzer abgebrochen wurde
    pub fn ist_abbruch(&self) -> bool {
        matches!(self, Self::Abgebrochen)
    }

    /// Payload im Feld-Format der Session-Schnittstelle
    pub fn payload(&self) -> FehlerPayload {
        FehlerPayload::from(self)
    }
}

impl From<AutoritaetsAblehnung> for UpgradeFehler {
    fn from(a: AutoritaetsAblehnung) -> Self {
        Self::Authentifizierung {
            fehler: a.fehler,
            nachricht: a.nachricht,
        }
    }
}

impl From<UpgradeFehler> for SpeakeasyError {
    fn from(e: UpgradeFehler) -> Self {
        match e {
            UpgradeFehler::Verbindung { fehler, nachricht } => {
                SpeakeasyError::Verbindung { fehler, nachricht }
            }
            UpgradeFehler::Authentifizierung { fehler, nachricht } => {
                SpeakeasyError::Authentifizierung { fehler, nachricht }
            }
            UpgradeFehler::Abgebrochen => SpeakeasyError::Abgebrochen,
            UpgradeFehler::Zeitlimit { nach_ms } => {
                SpeakeasyError::Zeitlimit(format!("Moderator-Upgrade nach {nach_ms} ms"))
            }
            UpgradeFehler::KeineLaufzeit => {
                SpeakeasyError::intern(UpgradeFehler::KeineLaufzeit.to_string())
            }
        }
    }
}

/// Fehler-Payload mit optionalen Feldern
///
/// Ein Abbruch serialisiert zu `{}`; Aufrufer unterscheiden die Ausgaenge
/// anhand der vorhandenen Felder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FehlerPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FehlerPayload {
    /// Leere Payload = Abbruch durch den Benutzer
    pub fn ist_leer(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&UpgradeFehler> for FehlerPayload {
    fn from(e: &UpgradeFehler) -> Self {
        match e {
            UpgradeFehler::Verbindung { fehler, nachricht } => Self {
                connection_error: Some(fehler.clone()),
                message: Some(nachricht.clone()),
                ..Self::default()
            },
            UpgradeFehler::Authentifizierung { fehler, nachricht } => Self {
                authentication_error: Some(fehler.clone()),
                message: Some(nachricht.clone()),
                ..Self::default()
            },
            UpgradeFehler::Abgebrochen => Self::default(),
            UpgradeFehler::Zeitlimit { .. } => Self {
                timeout: Some(true),
                message: Some(e.to_string()),
                ..Self::default()
            },
            UpgradeFehler::KeineLaufzeit => Self {
                message: Some(e.to_string()),
                ..Self::default()
            },
        }
    }
}

/// Ergebnis eines Upgrade-Versuchs
pub type UpgradeErgebnis = Result<(), UpgradeFehler>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbruch_ist_leere_payload() {
        let payload = UpgradeFehler::Abgebrochen.payload();
        assert!(payload.ist_leer());
        assert_eq!(serde_json::to_string(&payload).unwrap(), "{}");
    }

    #[test]
    fn verbindungsfehler_payload() {
        let e = UpgradeFehler::Verbindung {
            fehler: "connection.passwordRequired".into(),
            nachricht: "Passwort fehlt".into(),
        };
        let json = serde_json::to_value(e.payload()).unwrap();
        assert_eq!(json["connectionError"], "connection.passwordRequired");
        assert_eq!(json["message"], "Passwort fehlt");
        assert!(json.get("authenticationError").is_none());
    }

    #[test]
    fn ablehnung_wird_zu_authentifizierungsfehler() {
        let e: UpgradeFehler = AutoritaetsAblehnung::neu("not-authorized", "nein").into();
        let payload = e.payload();
        assert_eq!(payload.authentication_error.as_deref(), Some("not-authorized"));
        assert_eq!(payload.message.as_deref(), Some("nein"));
        assert!(payload.connection_error.is_none());
        assert!(!e.ist_abbruch());
    }

    #[test]
    fn zeitlimit_payload_ist_nicht_leer() {
        let payload = UpgradeFehler::Zeitlimit { nach_ms: 1500 }.payload();
        assert_eq!(payload.timeout, Some(true));
        assert!(!payload.ist_leer());
    }

    #[test]
    fn konvertierung_in_speakeasy_error() {
        let e: SpeakeasyError = UpgradeFehler::Abgebrochen.into();
        assert!(e.ist_abbruch());

        let e: SpeakeasyError = UpgradeFehler::Zeitlimit { nach_ms: 10 }.into();
        assert!(matches!(e, SpeakeasyError::Zeitlimit(_)));
    }

    #[test]
    fn fehlende_laufzeit_ist_interner_fehler() {
        let payload = UpgradeFehler::KeineLaufzeit.payload();
        assert!(!payload.ist_leer());
        assert!(payload.connection_error.is_none());

        let e: SpeakeasyError = UpgradeFehler::KeineLaufzeit.into();
        assert!(matches!(e, SpeakeasyError::Intern(_)));
        assert!(!e.ist_abbruch());
    }
}
