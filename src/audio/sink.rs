use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc::UnboundedSender;

use super::decoder::DecodedAudio;
use crate::error::SinkError;

/// Cómo terminó una reproducción
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// El sink quedó libre (fin natural, `stop` o `skip`)
    Ended,
    Errored(String),
}

/// Mensajes del buzón del motor de una guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSignal {
    /// Arrancar si el motor está detenido
    Start,
    Finished { generation: u64, outcome: PlaybackOutcome },
}

/// Oyente de un único uso para una reproducción.
///
/// El sink lo registra tanto para el fin como para el error; sólo el primer
/// evento llega al motor, los siguientes se descartan.
#[derive(Debug, Clone)]
pub struct PlaybackListener {
    generation: u64,
    fired: Arc<AtomicBool>,
    signals: UnboundedSender<PlaybackSignal>,
}

impl PlaybackListener {
    pub(crate) fn new(generation: u64, signals: UnboundedSender<PlaybackSignal>) -> Self {
        Self {
            generation,
            fired: Arc::new(AtomicBool::new(false)),
            signals,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg(test)]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Entrega el resultado al motor. Devuelve `false` si ya se había disparado.
    pub fn fire(&self, outcome: PlaybackOutcome) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }

        // Si el motor ya no existe (guild abandonada) el envío falla y da igual
        let _ = self.signals.send(PlaybackSignal::Finished {
            generation: self.generation,
            outcome,
        });
        true
    }
}

/// Salida de audio de una sesión de voz
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Reproduce `audio` reemplazando lo que hubiera; `listener` recibe el fin o el error
    async fn play(&self, audio: DecodedAudio, listener: PlaybackListener) -> Result<(), SinkError>;

    /// Detiene la pista actual; el oyente pendiente recibe `Ended`
    async fn stop(&self);

    async fn pause(&self) -> bool;

    async fn resume(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn listener_fires_once_across_clones() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener = PlaybackListener::new(7, tx);
        let on_error = listener.clone();

        assert!(listener.fire(PlaybackOutcome::Ended));
        assert!(!on_error.fire(PlaybackOutcome::Errored("boom".into())));
        assert!(on_error.has_fired());

        assert_eq!(
            rx.recv().await,
            Some(PlaybackSignal::Finished {
                generation: 7,
                outcome: PlaybackOutcome::Ended
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn firing_after_the_engine_is_gone_is_harmless() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let listener = PlaybackListener::new(1, tx);
        assert!(listener.fire(PlaybackOutcome::Ended));
    }
}
