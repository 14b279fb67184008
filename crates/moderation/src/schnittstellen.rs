//! Schnittstellen zu den externen Kollaborateuren des Upgrades
//!
//! Transport, Konferenzraum und Haupt-Session werden ausserhalb dieses
//! Crates implementiert. Das Upgrade kennt sie nur ueber diese Traits.
//!
//! ```text
//! ElternSession ──(Optionen)──> ZweitVerbindung ──create_room──> ModeratorRaum
//!       ^                                                            |
//!       +────────────── join(raum_passwort) <── authentifiziert ─────+
//! ```

use async_trait::async_trait;
use speakeasy_core::{RaumKonfiguration, VerbindungsEreignis, VerbindungsOptionen};
use tokio::sync::broadcast;

use crate::error::AutoritaetsAblehnung;

/// Kurzlebige Signaling-Verbindung fuer die Anmeldung mit Zugangsdaten
///
/// `connect` und `disconnect` stossen nur an; der Ausgang wird ueber den
/// Ereignis-Strom gemeldet. Implementierungen muessen `disconnect` auch im
/// bereits getrennten Zustand vertragen.
pub trait ZweitVerbindung: Send + Sync + 'static {
    /// Raum-Handle den diese Verbindung erzeugt
    type Raum: ModeratorRaum;

    /// Abonniert den Ereignis-Strom
    ///
    /// Ereignisse ab dem Zeitpunkt des Abonnements werden zugestellt.
    fn ereignisse(&self) -> broadcast::Receiver<VerbindungsEreignis>;

    /// Startet den Verbindungsaufbau mit Zugangsdaten
    fn connect(&self, id: &str, passwort: &str);

    /// Trennt die Verbindung
    fn disconnect(&self);

    /// Erzeugt den Raum-Handle fuer die Moderator-Anmeldung
    fn create_room(&self, raum_name: &str, konfiguration: &RaumKonfiguration) -> Self::Raum;
}

/// Raum-Handle auf der Zweitverbindung
#[async_trait]
pub trait ModeratorRaum: Send + Sync + 'static {
    /// Fordert bei der Session-Autoritaet die Moderator-Rolle an
    async fn moderator_authentifizieren(&self) -> Result<(), AutoritaetsAblehnung>;
}

/// Haupt-Session des Aufrufers (nicht im Besitz des Upgrades)
pub trait ElternSession: Send + Sync + 'static {
    /// Name des Konferenzraums
    fn raum_name(&self) -> &str;

    /// Konfiguration des Konferenzraums
    fn raum_konfiguration(&self) -> &RaumKonfiguration;

    /// Transport-Optionen der Hauptverbindung
    fn verbindungs_optionen(&self) -> &VerbindungsOptionen;

    /// Tritt dem Raum (erneut) bei, jetzt mit erhoehten Rechten
    ///
    /// Der Beitritt selbst laeuft asynchron in der Session weiter.
    fn join(&self, raum_passwort: Option<&str>);
}
