//! Ausstehender Upgrade-Vorgang
//!
//! `Vorgang` ist ein klonbares Future auf das Ergebnis eines Versuchs.
//! `Abschluss` ist die zugehoerige Schreibseite: der erste Abschluss
//! gewinnt, alle weiteren sind wirkungslos.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::UpgradeErgebnis;

/// Handle auf einen laufenden oder abgeschlossenen Upgrade-Versuch
///
/// Alle Klone teilen dasselbe Ergebnis. Wird der Versuch nie
/// abgeschlossen, bleibt das Future dauerhaft ausstehend.
#[derive(Clone)]
pub struct Vorgang {
    inner: Shared<BoxFuture<'static, UpgradeErgebnis>>,
}

impl Vorgang {
    /// Erstellt einen Vorgang und die zugehoerige Schreibseite
    pub(crate) fn neu() -> (Self, Abschluss) {
        let (tx, rx) = oneshot::channel();
        let inner = async move {
            match rx.await {
                Ok(ergebnis) => ergebnis,
                // Schreibseite ohne Abschluss verworfen: bleibt ausstehend
                Err(_) => std::future::pending().await,
            }
        }
        .boxed()
        .shared();

        let abschluss = Abschluss {
            sender: Mutex::new(Some(tx)),
            erledigt: CancellationToken::new(),
        };
        (Self { inner }, abschluss)
    }

    /// Gibt true zurueck wenn beide Handles denselben Versuch beschreiben
    pub fn ist_derselbe(&self, anderer: &Vorgang) -> bool {
        self.inner.ptr_eq(&anderer.inner)
    }

    /// Ergebnis, sofern der Vorgang bereits bis zum Ende gepollt wurde
    pub fn ergebnis(&self) -> Option<UpgradeErgebnis> {
        self.inner.peek().cloned()
    }
}

impl Future for Vorgang {
    type Output = UpgradeErgebnis;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for Vorgang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vorgang")
            .field("ergebnis", &self.inner.peek())
            .finish()
    }
}

/// Schreibseite eines Vorgangs
pub(crate) struct Abschluss {
    sender: Mutex<Option<oneshot::Sender<UpgradeErgebnis>>>,
    erledigt: CancellationToken,
}

impl Abschluss {
    /// Schliesst den Vorgang ab. Gibt false zurueck wenn bereits abgeschlossen.
    pub(crate) fn abschliessen(&self, ergebnis: UpgradeErgebnis) -> bool {
        self.abschliessen_nach(ergebnis, || {})
    }

    /// Schliesst den Vorgang ab und fuehrt `vorher` unmittelbar davor aus.
    ///
    /// `vorher` laeuft nur, wenn dieser Aufruf den Abschluss gewinnt.
    pub(crate) fn abschliessen_nach(
        &self,
        ergebnis: UpgradeErgebnis,
        vorher: impl FnOnce(),
    ) -> bool {
        let Some(tx) = self.sender.lock().take() else {
            return false;
        };
        vorher();
        // Empfaenger lebt im Shared-Future, das nie vor dem Vorgang verworfen wird
        let _ = tx.send(ergebnis);
        self.erledigt.cancel();
        true
    }

    pub(crate) fn ist_abgeschlossen(&self) -> bool {
        self.erledigt.is_cancelled()
    }

    /// Token das beim Abschluss ausgeloest wird
    pub(crate) fn erledigt(&self) -> CancellationToken {
        self.erledigt.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpgradeFehler;

    #[test]
    fn erster_abschluss_gewinnt() {
        let (vorgang, abschluss) = Vorgang::neu();
        assert!(!abschluss.ist_abgeschlossen());

        assert!(abschluss.abschliessen(Err(UpgradeFehler::Abgebrochen)));
        assert!(!abschluss.abschliessen(Ok(())));
        assert!(abschluss.ist_abgeschlossen());

        assert_eq!(vorgang.now_or_never(), Some(Err(UpgradeFehler::Abgebrochen)));
    }

    #[test]
    fn vorher_laeuft_nur_beim_gewinner() {
        let (_vorgang, abschluss) = Vorgang::neu();
        let mut aufrufe = 0;
        abschluss.abschliessen_nach(Ok(()), || aufrufe += 1);
        abschluss.abschliessen_nach(Ok(()), || aufrufe += 1);
        assert_eq!(aufrufe, 1);
    }

    #[test]
    fn klone_teilen_ergebnis() {
        let (vorgang, abschluss) = Vorgang::neu();
        let klon = vorgang.clone();
        assert!(klon.ist_derselbe(&vorgang));

        let (anderer, _) = Vorgang::neu();
        assert!(!anderer.ist_derselbe(&vorgang));

        abschluss.abschliessen(Ok(()));
        assert_eq!(klon.clone().now_or_never(), Some(Ok(())));
        assert_eq!(klon.ergebnis(), Some(Ok(())));
        assert_eq!(vorgang.now_or_never(), Some(Ok(())));
    }

    #[test]
    fn verworfene_schreibseite_bleibt_ausstehend() {
        let (vorgang, abschluss) = Vorgang::neu();
        drop(abschluss);
        assert!(vorgang.clone().now_or_never().is_none());
        assert!(vorgang.ergebnis().is_none());
    }

    #[tokio::test]
    async fn erledigt_token_wird_ausgeloest() {
        let (_vorgang, abschluss) = Vorgang::neu();
        let erledigt = abschluss.erledigt();
        abschluss.abschliessen(Ok(()));
        erledigt.cancelled().await;
    }
}
