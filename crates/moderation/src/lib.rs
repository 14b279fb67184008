//! speakeasy-moderation – Moderator-Rollen-Upgrade
//!
//! Ein anonymer Konferenz-Teilnehmer meldet sich ueber eine kurzlebige
//! Zweitverbindung mit Zugangsdaten an, die Session-Autoritaet bestaetigt
//! die Moderator-Rolle, danach tritt die Haupt-Session dem Raum erneut bei.
//!
//! ## Architektur
//!
//! ```text
//! RollenUpgrade (pro Versuch eine Instanz)
//!     |  State Machine: Leerlauf -> Verbindungsaufbau -> Verbunden
//!     |                 -> Authentifizierung -> Abgeschlossen
//!     |
//!     +-- ZweitVerbindung  (connect, disconnect, Ereignis-Strom)
//!     +-- ModeratorRaum    (Moderator-Authentifizierung)
//!     +-- ElternSession    (join mit Raum-Passwort)
//!     |
//!     v
//! Vorgang – klonbares Future, genau ein Ergebnis
//! ```

pub mod config;
pub mod error;
pub mod schnittstellen;
pub mod upgrade;
pub mod vorgang;

// Bequeme Re-Exporte
pub use config::{ModeratorKonfiguration, UpgradeEinstellungen};
pub use error::{AutoritaetsAblehnung, FehlerPayload, UpgradeErgebnis, UpgradeFehler};
pub use schnittstellen::{ElternSession, ModeratorRaum, ZweitVerbindung};
pub use upgrade::{HandshakeZustand, LoginRueckruf, RollenUpgrade, UpgradeOptionen};
pub use vorgang::Vorgang;
