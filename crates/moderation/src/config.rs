//! Konfiguration des Moderator-Upgrades
//!
//! Wird aus einer TOML-Datei geladen. Alle Felder haben Standardwerte,
//! sodass das Upgrade ohne Konfigurationsdatei lauffaehig ist.
//!
//! ```toml
//! [upgrade]
//! zeitlimit_ms = 15000
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use speakeasy_core::{Result, SpeakeasyError};
use speakeasy_observability::logging::{log_format_gueltig, log_level_gueltig};

/// Vollstaendige Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeratorKonfiguration {
    /// Upgrade-Einstellungen
    pub upgrade: UpgradeEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Einstellungen fuer den Upgrade-Ablauf
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeEinstellungen {
    /// Zeitlimit fuer den gesamten Versuch in Millisekunden.
    /// `None` = unbegrenzt warten.
    pub zeitlimit_ms: Option<u64>,
}

impl UpgradeEinstellungen {
    /// Zeitlimit als `Duration`
    pub fn zeitlimit(&self) -> Option<Duration> {
        self.zeitlimit_ms.map(Duration::from_millis)
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ModeratorKonfiguration {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: impl AsRef<Path>) -> Result<Self> {
        let pfad = pfad.as_ref();
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt).map_err(|e| {
                SpeakeasyError::konfiguration(format!("'{}': {e}", pfad.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = %pfad.display(),
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(SpeakeasyError::konfiguration(format!(
                "Datei '{}' nicht lesbar: {e}",
                pfad.display()
            ))),
        }
    }

    /// Parst und validiert eine Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> Result<Self> {
        let konfig: Self =
            toml::from_str(inhalt).map_err(|e| SpeakeasyError::konfiguration(e.to_string()))?;
        konfig.validieren()?;
        Ok(konfig)
    }

    /// Prueft die Werte auf Plausibilitaet
    pub fn validieren(&self) -> Result<()> {
        if self.upgrade.zeitlimit_ms == Some(0) {
            return Err(SpeakeasyError::konfiguration(
                "upgrade.zeitlimit_ms muss groesser als 0 sein",
            ));
        }
        if !log_level_gueltig(&self.logging.level) {
            return Err(SpeakeasyError::konfiguration(format!(
                "Ungueltiges Log-Level: '{}'",
                self.logging.level
            )));
        }
        if !log_format_gueltig(&self.logging.format) {
            return Err(SpeakeasyError::konfiguration(format!(
                "Ungueltiges Log-Format: '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Initialisiert das Logging mit den konfigurierten Werten
    pub fn logging_initialisieren(&self) {
        speakeasy_observability::logging_initialisieren(&self.logging.level, &self.logging.format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ModeratorKonfiguration::default();
        assert!(cfg.upgrade.zeitlimit().is_none());
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, "text");
        cfg.validieren().unwrap();
    }

    #[test]
    fn config_aus_toml_string() {
        let cfg = ModeratorKonfiguration::aus_toml(
            r#"
            [upgrade]
            zeitlimit_ms = 2500

            [logging]
            level = "debug"
        "#,
        )
        .unwrap();
        assert_eq!(cfg.upgrade.zeitlimit(), Some(Duration::from_millis(2500)));
        assert_eq!(cfg.logging.level, "debug");
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.logging.format, "text");
    }

    #[test]
    fn zeitlimit_null_ist_ungueltig() {
        let ergebnis = ModeratorKonfiguration::aus_toml("[upgrade]\nzeitlimit_ms = 0\n");
        assert!(matches!(ergebnis, Err(SpeakeasyError::Konfiguration(_))));
    }

    #[test]
    fn ungueltiges_log_format_wird_abgelehnt() {
        let ergebnis = ModeratorKonfiguration::aus_toml("[logging]\nformat = \"xml\"\n");
        assert!(ergebnis.is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let verzeichnis = tempfile::tempdir().unwrap();
        let cfg = ModeratorKonfiguration::laden(verzeichnis.path().join("fehlt.toml")).unwrap();
        assert!(cfg.upgrade.zeitlimit_ms.is_none());
    }

    #[test]
    fn datei_wird_geladen() {
        let mut datei = tempfile::NamedTempFile::new().unwrap();
        writeln!(datei, "[upgrade]\nzeitlimit_ms = 100").unwrap();
        let cfg = ModeratorKonfiguration::laden(datei.path()).unwrap();
        assert_eq!(cfg.upgrade.zeitlimit_ms, Some(100));
    }

    #[test]
    fn kaputte_datei_nennt_pfad() {
        let mut datei = tempfile::NamedTempFile::new().unwrap();
        writeln!(datei, "[upgrade\nzeitlimit_ms = ").unwrap();
        let fehler = ModeratorKonfiguration::laden(datei.path()).unwrap_err();
        assert!(matches!(fehler, SpeakeasyError::Konfiguration(_)));
        assert!(fehler.to_string().contains("Konfigurationsfehler"));
        assert!(fehler.to_string().contains(&datei.path().display().to_string()));
    }
}
