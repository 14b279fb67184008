//! Rollen-Upgrade – Anonymer Teilnehmer wird Moderator
//!
//! Baut eine Zweitverbindung mit Zugangsdaten auf, laesst sich ueber einen
//! Raum-Handle von der Session-Autoritaet als Moderator bestaetigen und
//! weist danach die Haupt-Session an, dem Raum erneut beizutreten.
//!
//! ## State Machine
//! ```text
//! Leerlauf -> Verbindungsaufbau -> Verbunden -> Authentifizierung -> Abgeschlossen
//!                 |                    |               |
//!                 +-- Fehlgeschlagen --+---------------+--> Abgeschlossen (Fehler)
//!
//! cancel() in jedem Zustand: Abbruch wird gelatcht, Verbindung getrennt,
//! das folgende `Getrennt`-Ereignis schliesst mit `Abgebrochen` ab.
//! ```
//!
//! ## Garantien
//! - Pro Instanz hoechstens ein Versuch; weitere Aufrufe liefern denselben
//!   `Vorgang` zurueck und ignorieren ihre Optionen.
//! - Der Vorgang wird genau einmal abgeschlossen, spaetere Ereignisse sind
//!   wirkungslos.
//! - Die Zweitverbindung wird auf jedem Weg aus `Verbunden` heraus getrennt.
//! - `join` der Haupt-Session nur nach erfolgreicher Authentifizierung ohne
//!   Abbruch.
//! - Wird der `RollenUpgrade` vor dem Abschluss verworfen, beenden sich alle
//!   Tasks, die Verbindung wird getrennt und ein noch gehaltener `Vorgang`
//!   schliesst mit `Abgebrochen` ab.
//!
//! ## Bekannte Grenzen
//! - Ohne konfiguriertes Zeitlimit wartet ein Versuch unbegrenzt, wenn die
//!   Verbindung nie ein Ereignis meldet.
//! - Abbruch waehrend der Authentifizierung mit anschliessendem Erfolg
//!   schliesst den Vorgang nicht ueber den Erfolgsweg ab. Abgeschlossen wird
//!   erst durch das `Getrennt`-Ereignis; meldet die Verbindung dieses nie,
//!   bleibt der Vorgang ausstehend.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use speakeasy_core::{VerbindungsEreignis, VerbindungsOptionen, VersuchId};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::UpgradeEinstellungen;
use crate::error::{UpgradeErgebnis, UpgradeFehler};
use crate::schnittstellen::{ElternSession, ModeratorRaum, ZweitVerbindung};
use crate::vorgang::{Abschluss, Vorgang};

// ---------------------------------------------------------------------------
// Optionen
// ---------------------------------------------------------------------------

/// Rueckruf nach erfolgreicher Anmeldung der Zweitverbindung
pub type LoginRueckruf = Box<dyn FnOnce() + Send + 'static>;

/// Eingaben fuer `authenticate_and_upgrade_role`
pub struct UpgradeOptionen {
    /// Kennung der Zugangsdaten (z.B. `moderator@meet.example.org`)
    pub id: String,
    /// Passwort der Zugangsdaten
    pub passwort: String,
    /// Passwort des Konferenzraums fuer den erneuten Beitritt
    pub raum_passwort: Option<String>,
    /// Wird genau einmal aufgerufen sobald die Zweitverbindung steht,
    /// vor Beginn der Authentifizierung
    pub bei_login_erfolg: Option<LoginRueckruf>,
}

impl UpgradeOptionen {
    pub fn neu(id: impl Into<String>, passwort: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            passwort: passwort.into(),
            raum_passwort: None,
            bei_login_erfolg: None,
        }
    }

    pub fn mit_raum_passwort(mut self, raum_passwort: impl Into<String>) -> Self {
        self.raum_passwort = Some(raum_passwort.into());
        self
    }

    pub fn bei_login_erfolg(mut self, rueckruf: impl FnOnce() + Send + 'static) -> Self {
        self.bei_login_erfolg = Some(Box::new(rueckruf));
        self
    }
}

impl fmt::Debug for UpgradeOptionen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeOptionen")
            .field("id", &self.id)
            .field("passwort", &"***")
            .field("raum_passwort", &self.raum_passwort.as_ref().map(|_| "***"))
            .field("bei_login_erfolg", &self.bei_login_erfolg.is_some())
            .finish()
    }
}

/// Teil der Optionen, der erst nach dem Verbindungsaufbau gebraucht wird
struct Anmeldung {
    raum_passwort: Option<String>,
    bei_login_erfolg: Option<LoginRueckruf>,
}

// ---------------------------------------------------------------------------
// Zustand
// ---------------------------------------------------------------------------

/// Fortschritt eines Upgrade-Versuchs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeZustand {
    /// Noch nicht gestartet
    Leerlauf,
    /// Zweitverbindung wird aufgebaut
    Verbindungsaufbau,
    /// Zweitverbindung steht, Raum-Handle wird erzeugt
    Verbunden,
    /// Moderator-Authentifizierung laeuft
    Authentifizierung,
    /// Vorgang abgeschlossen (Erfolg oder Fehler)
    Abgeschlossen,
}

// ---------------------------------------------------------------------------
// RollenUpgrade
// ---------------------------------------------------------------------------

/// Steuert einen einzelnen Moderator-Upgrade-Versuch
///
/// Die Instanz besitzt ihre Zweitverbindung exklusiv; die Haupt-Session wird
/// nur geteilt. Nach Abschluss oder Abbruch wird die Instanz verworfen.
///
/// Die Ereignis-Verarbeitung laeuft in tokio-Tasks. Ausserhalb einer
/// tokio-Runtime schliesst `authenticate_and_upgrade_role` sofort mit
/// `KeineLaufzeit` ab.
pub struct RollenUpgrade<S: ElternSession, C: ZweitVerbindung> {
    inner: Arc<UpgradeInner<S, C>>,
}

struct UpgradeInner<S: ElternSession, C: ZweitVerbindung> {
    id: VersuchId,
    session: Arc<S>,
    verbindung: C,
    /// Raum-Handle, nur waehrend der Authentifizierung gesetzt
    raum: Mutex<Option<Arc<C::Raum>>>,
    /// Latch fuer cancel(), wird nie zurueckgesetzt
    abbruch: CancellationToken,
    /// Ausgeloest wenn der `RollenUpgrade` verworfen wird
    beendet: CancellationToken,
    zustand: Mutex<HandshakeZustand>,
    /// Single-Flight: der einzige Vorgang dieser Instanz
    vorgang: Mutex<Option<Vorgang>>,
    einstellungen: UpgradeEinstellungen,
}

impl<S: ElternSession, C: ZweitVerbindung> RollenUpgrade<S, C> {
    /// Erstellt ein Upgrade ohne Zeitlimit
    ///
    /// `verbindung_bauen` erhaelt die Transport-Optionen der Hauptverbindung
    /// und liefert eine neue, noch nicht verbundene Zweitverbindung.
    pub fn neu(
        session: Arc<S>,
        verbindung_bauen: impl FnOnce(&VerbindungsOptionen) -> C,
    ) -> Self {
        Self::mit_einstellungen(session, UpgradeEinstellungen::default(), verbindung_bauen)
    }

    /// Erstellt ein Upgrade mit expliziten Einstellungen
    pub fn mit_einstellungen(
        session: Arc<S>,
        einstellungen: UpgradeEinstellungen,
        verbindung_bauen: impl FnOnce(&VerbindungsOptionen) -> C,
    ) -> Self {
        let verbindung = verbindung_bauen(session.verbindungs_optionen());
        let id = VersuchId::new();
        tracing::debug!(versuch = %id, raum = %session.raum_name(), "Rollen-Upgrade erstellt");

        Self {
            inner: Arc::new(UpgradeInner {
                id,
                session,
                verbindung,
                raum: Mutex::new(None),
                abbruch: CancellationToken::new(),
                beendet: CancellationToken::new(),
                zustand: Mutex::new(HandshakeZustand::Leerlauf),
                vorgang: Mutex::new(None),
                einstellungen,
            }),
        }
    }

    /// Startet das Upgrade oder liefert den bereits laufenden Vorgang
    ///
    /// Nur der erste Aufruf pro Instanz baut eine Verbindung auf; die
    /// Optionen weiterer Aufrufe werden ignoriert. Wurde `cancel()` vorher
    /// aufgerufen, ist der Vorgang sofort mit `Abgebrochen` abgeschlossen
    /// und es wird keine Verbindung aufgebaut.
    pub fn authenticate_and_upgrade_role(&self, optionen: UpgradeOptionen) -> Vorgang {
        let inner = &self.inner;

        let (vorgang, abschluss) = {
            let mut slot = inner.vorgang.lock();
            if let Some(vorgang) = slot.as_ref() {
                tracing::debug!(versuch = %inner.id, "Upgrade laeuft bereits, Optionen ignoriert");
                return vorgang.clone();
            }
            let (vorgang, abschluss) = Vorgang::neu();
            *slot = Some(vorgang.clone());
            (vorgang, Arc::new(abschluss))
        };

        if inner.abbruch.is_cancelled() {
            tracing::info!(versuch = %inner.id, "Upgrade vor dem Start abgebrochen");
            inner.abschliessen(&abschluss, Err(UpgradeFehler::Abgebrochen));
            return vorgang;
        }

        let laufzeit = match tokio::runtime::Handle::try_current() {
            Ok(laufzeit) => laufzeit,
            Err(e) => {
                tracing::error!(versuch = %inner.id, fehler = %e, "Upgrade ohne tokio-Runtime gestartet");
                inner.abschliessen(&abschluss, Err(UpgradeFehler::KeineLaufzeit));
                return vorgang;
            }
        };

        let span = tracing::info_span!(
            "rollen_upgrade",
            versuch = %inner.id,
            raum = %inner.session.raum_name()
        );

        // Listener vor dem Verbindungsaufbau registrieren
        let empfaenger = inner.verbindung.ereignisse();
        inner.uebergang(HandshakeZustand::Verbindungsaufbau);

        let UpgradeOptionen {
            id,
            passwort,
            raum_passwort,
            bei_login_erfolg,
        } = optionen;
        let anmeldung = Anmeldung {
            raum_passwort,
            bei_login_erfolg,
        };

        laufzeit.spawn(
            ereignisse_verarbeiten(
                Arc::clone(inner),
                Arc::clone(&abschluss),
                empfaenger,
                anmeldung,
            )
            .instrument(span.clone()),
        );

        if let Some(dauer) = inner.einstellungen.zeitlimit() {
            laufzeit.spawn(
                Arc::clone(inner)
                    .zeitlimit_ueberwachen(Arc::clone(&abschluss), dauer)
                    .instrument(span.clone()),
            );
        }

        span.in_scope(|| {
            tracing::info!(id = %id, "Starte Zweitverbindung fuer Moderator-Upgrade");
        });
        inner.verbindung.connect(&id, &passwort);

        // cancel() zwischen Pruefung und connect: Trennung nachholen
        if inner.abbruch.is_cancelled() {
            inner.verbindung.disconnect();
        }

        vorgang
    }

    /// Bricht das Upgrade ab
    ///
    /// Latcht den Abbruch und trennt die Zweitverbindung. Der Vorgang wird
    /// durch das folgende `Getrennt`-Ereignis abgeschlossen, oder sofort beim
    /// naechsten Start, falls noch keiner lief. Mehrfacher Aufruf ist
    /// wirkungslos.
    pub fn cancel(&self) {
        let inner = &self.inner;
        if !inner.abbruch.is_cancelled() {
            tracing::info!(
                versuch = %inner.id,
                zustand = ?self.zustand(),
                "Upgrade-Abbruch angefordert"
            );
        }
        inner.abbruch.cancel();
        inner.verbindung.disconnect();
    }

    /// Aktueller Fortschritt
    pub fn zustand(&self) -> HandshakeZustand {
        *self.inner.zustand.lock()
    }

    /// Gibt true zurueck wenn `cancel()` aufgerufen wurde
    pub fn ist_abgebrochen(&self) -> bool {
        self.inner.abbruch.is_cancelled()
    }

    /// Der laufende oder abgeschlossene Vorgang, falls bereits gestartet
    pub fn vorgang(&self) -> Option<Vorgang> {
        self.inner.vorgang.lock().clone()
    }

    /// Gibt true zurueck solange ein Raum-Handle gehalten wird
    pub fn hat_raum(&self) -> bool {
        self.inner.raum.lock().is_some()
    }

    pub fn versuch_id(&self) -> VersuchId {
        self.inner.id
    }
}

impl<S: ElternSession, C: ZweitVerbindung> Drop for RollenUpgrade<S, C> {
    fn drop(&mut self) {
        let inner = &self.inner;
        inner.beendet.cancel();

        let zustand = *inner.zustand.lock();
        let offen = !matches!(
            zustand,
            HandshakeZustand::Leerlauf | HandshakeZustand::Abgeschlossen
        );
        // Nach cancel() ist bereits getrennt
        if offen && !inner.abbruch.is_cancelled() {
            tracing::debug!(versuch = %inner.id, zustand = ?zustand, "Upgrade verworfen, trenne Zweitverbindung");
            inner.verbindung.disconnect();
        }
    }
}

// ---------------------------------------------------------------------------
// Ablauf
// ---------------------------------------------------------------------------

impl<S: ElternSession, C: ZweitVerbindung> UpgradeInner<S, C> {
    fn uebergang(&self, neu: HandshakeZustand) {
        let mut zustand = self.zustand.lock();
        tracing::trace!(von = ?*zustand, nach = ?neu, "Zustandswechsel");
        *zustand = neu;
    }

    fn abschliessen(&self, abschluss: &Abschluss, ergebnis: UpgradeErgebnis) -> bool {
        self.abschliessen_nach(abschluss, ergebnis, || {})
    }

    /// Schliesst den Vorgang ab; `vorher` laeuft nur beim ersten Abschluss
    fn abschliessen_nach(
        &self,
        abschluss: &Abschluss,
        ergebnis: UpgradeErgebnis,
        vorher: impl FnOnce(),
    ) -> bool {
        let protokoll = ergebnis.clone();
        let gewonnen = abschluss.abschliessen_nach(ergebnis, || {
            vorher();
            *self.zustand.lock() = HandshakeZustand::Abgeschlossen;
        });

        if !gewonnen {
            tracing::debug!(ergebnis = ?protokoll, "Vorgang bereits abgeschlossen, ignoriert");
            return false;
        }
        match protokoll {
            Ok(()) => tracing::info!("Moderator-Upgrade erfolgreich"),
            Err(e) if e.ist_abbruch() => tracing::info!("Moderator-Upgrade abgebrochen"),
            Err(e) => tracing::warn!(fehler = %e, "Moderator-Upgrade fehlgeschlagen"),
        }
        true
    }

    /// Zweitverbindung steht: Rueckruf, Raum-Handle, Authentifizierung
    fn bei_hergestellt(self: &Arc<Self>, abschluss: &Arc<Abschluss>, anmeldung: &mut Anmeldung) {
        if self.abbruch.is_cancelled() {
            // Abschluss folgt ueber das Getrennt-Ereignis
            tracing::debug!("Verbindung nach Abbruch hergestellt, ignoriert");
            return;
        }
        {
            let mut zustand = self.zustand.lock();
            if *zustand != HandshakeZustand::Verbindungsaufbau {
                tracing::debug!(zustand = ?*zustand, "Wiederholtes Hergestellt ignoriert");
                return;
            }
            *zustand = HandshakeZustand::Verbunden;
        }
        tracing::info!("Zweitverbindung hergestellt");

        if let Some(rueckruf) = anmeldung.bei_login_erfolg.take() {
            rueckruf();
        }

        let raum = Arc::new(self.verbindung.create_room(
            self.session.raum_name(),
            self.session.raum_konfiguration(),
        ));
        *self.raum.lock() = Some(Arc::clone(&raum));
        self.uebergang(HandshakeZustand::Authentifizierung);

        tokio::spawn(
            Arc::clone(self)
                .authentifizieren(raum, Arc::clone(abschluss), anmeldung.raum_passwort.take())
                .in_current_span(),
        );
    }

    async fn authentifizieren(
        self: Arc<Self>,
        raum: Arc<C::Raum>,
        abschluss: Arc<Abschluss>,
        raum_passwort: Option<String>,
    ) {
        tracing::debug!("Fordere Moderator-Rolle an");
        let ergebnis = tokio::select! {
            _ = self.beendet.cancelled() => None,
            ergebnis = raum.moderator_authentifizieren() => Some(ergebnis),
        };
        self.raum.lock().take();
        let Some(ergebnis) = ergebnis else {
            tracing::debug!("Upgrade verworfen, Authentifizierung nicht abgewartet");
            return;
        };

        match ergebnis {
            Ok(()) => {
                if self.abbruch.is_cancelled() {
                    tracing::info!("Authentifizierung nach Abbruch erfolgreich, kein Beitritt");
                    return;
                }
                self.verbindung.disconnect();
                let session = &self.session;
                let beigetreten = self.abschliessen_nach(&abschluss, Ok(()), || {
                    session.join(raum_passwort.as_deref());
                });
                if !beigetreten {
                    tracing::warn!("Authentifizierung nach Abschluss erfolgreich, kein Beitritt");
                }
            }
            Err(ablehnung) => {
                tracing::warn!(
                    fehler = %ablehnung.fehler,
                    nachricht = %ablehnung.nachricht,
                    "Session-Autoritaet lehnt Moderator-Rolle ab"
                );
                self.verbindung.disconnect();
                self.abschliessen(&abschluss, Err(ablehnung.into()));
            }
        }
    }

    async fn zeitlimit_ueberwachen(self: Arc<Self>, abschluss: Arc<Abschluss>, dauer: Duration) {
        let erledigt = abschluss.erledigt();
        tokio::select! {
            _ = erledigt.cancelled() => {}
            _ = self.beendet.cancelled() => {}
            _ = tokio::time::sleep(dauer) => {
                let nach_ms = u64::try_from(dauer.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(nach_ms, zustand = ?*self.zustand.lock(), "Zeitlimit fuer Upgrade erreicht");
                self.abschliessen_nach(&abschluss, Err(UpgradeFehler::Zeitlimit { nach_ms }), || {
                    self.verbindung.disconnect();
                });
            }
        }
    }
}

/// Verarbeitet die Ereignisse der Zweitverbindung bis zum Abschluss
async fn ereignisse_verarbeiten<S: ElternSession, C: ZweitVerbindung>(
    inner: Arc<UpgradeInner<S, C>>,
    abschluss: Arc<Abschluss>,
    mut empfaenger: broadcast::Receiver<VerbindungsEreignis>,
    mut anmeldung: Anmeldung,
) {
    let erledigt = abschluss.erledigt();

    loop {
        let ereignis = tokio::select! {
            biased;
            _ = erledigt.cancelled() => break,
            _ = inner.beendet.cancelled() => {
                inner.abschliessen(&abschluss, Err(UpgradeFehler::Abgebrochen));
                break;
            }
            empfangen = empfaenger.recv() => match empfangen {
                Ok(ereignis) => ereignis,
                Err(RecvError::Lagged(verpasst)) => {
                    tracing::warn!(verpasst, "Verbindungsereignisse verpasst");
                    continue;
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("Ereignis-Strom geschlossen");
                    break;
                }
            },
        };
        tracing::trace!(ereignis = ereignis.name(), "Verbindungsereignis");

        match ereignis {
            VerbindungsEreignis::Hergestellt => {
                inner.bei_hergestellt(&abschluss, &mut anmeldung);
            }
            VerbindungsEreignis::Fehlgeschlagen { fehler, nachricht } => {
                // Wird unabhaengig vom Abbruch gemeldet
                inner.abschliessen(&abschluss, Err(UpgradeFehler::Verbindung { fehler, nachricht }));
            }
            VerbindungsEreignis::Getrennt => {
                if inner.abbruch.is_cancelled() {
                    inner.abschliessen(&abschluss, Err(UpgradeFehler::Abgebrochen));
                } else {
                    tracing::debug!("Zweitverbindung getrennt");
                }
            }
        }
    }
}
