//! Per-guild playback state machine.
//!
//! One [`PlaybackEngine`] task runs per guild and consumes
//! [`PlaybackSignal`]s one at a time, so two starts can never interleave.
//! Each signal is handled by an explicit driving loop over
//! `Stopped -> Resolving -> Downloading -> Streaming`, and terminal sink events
//! go through `Advancing` according to the loop mode.
//!
//! The shared [`GuildState`] is only locked between suspension points; every
//! lock is released before awaiting the resolver, the decoder, the sink or a
//! timer.

use parking_lot::Mutex;
use serenity::model::id::GuildId;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    decoder::AudioDecoder,
    notice::{Notice, Notifier, SkipReason},
    queue::{GuildQueue, LoopMode, SongRef},
    sink::{AudioSink, PlaybackListener, PlaybackOutcome, PlaybackSignal},
    tempfile::TempFileManager,
};
use crate::{error::DownloadError, sources::MediaResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Stopped,
    Resolving,
    Downloading { attempt: u32 },
    Streaming { generation: u64 },
    Advancing,
}

/// Estado mutable de una guild, compartido entre comandos y motor
pub struct GuildState {
    pub queue: GuildQueue,
    pub sink: Option<Arc<dyn AudioSink>>,
    pub active_temp_file: Option<PathBuf>,
    /// Prefijo de la descarga en curso; yt-dlp escribe directo en `<prefijo>.<ext>`
    pub pending_prefix: Option<PathBuf>,
    pub phase: PlaybackPhase,
}

impl GuildState {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            queue: GuildQueue::new(max_queue_size),
            sink: None,
            active_temp_file: None,
            pending_prefix: None,
            phase: PlaybackPhase::Stopped,
        }
    }

    /// Nada sonando y el motor detenido
    pub fn is_idle(&self) -> bool {
        self.queue.now_playing().is_none() && self.phase == PlaybackPhase::Stopped
    }
}

pub type SharedGuildState = Arc<Mutex<GuildState>>;

#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub download_attempts: u32,
    pub retry_backoff: Duration,
    pub error_debounce: Duration,
    pub max_queue_size: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            download_attempts: 3,
            retry_backoff: Duration::from_secs(2),
            error_debounce: Duration::from_millis(500),
            max_queue_size: 1000,
        }
    }
}

/// Colaboradores compartidos por todos los motores
pub struct EngineDeps {
    pub resolver: Arc<dyn MediaResolver>,
    pub decoder: Arc<dyn AudioDecoder>,
    pub notifier: Arc<dyn Notifier>,
    pub temp_files: TempFileManager,
    pub settings: PlaybackSettings,
}

enum Step {
    Continue,
    Halt,
}

enum Head {
    Empty(Option<Arc<dyn AudioSink>>),
    NoSink,
    Ready {
        song: SongRef,
        revision: u64,
        sink: Arc<dyn AudioSink>,
    },
}

enum DownloadFailure {
    Restricted(DownloadError),
    Exhausted {
        attempts: u32,
        last: Option<DownloadError>,
    },
}

impl DownloadFailure {
    fn reason(&self) -> SkipReason {
        match self {
            DownloadFailure::Restricted(_) => SkipReason::Restricted,
            DownloadFailure::Exhausted { attempts, .. } => SkipReason::DownloadFailed { attempts: *attempts },
        }
    }
}

pub struct PlaybackEngine {
    guild_id: GuildId,
    state: SharedGuildState,
    deps: Arc<EngineDeps>,
    signals: UnboundedSender<PlaybackSignal>,
    cancel: CancellationToken,
    generation: u64,
}

impl PlaybackEngine {
    pub fn new(
        guild_id: GuildId,
        state: SharedGuildState,
        deps: Arc<EngineDeps>,
        signals: UnboundedSender<PlaybackSignal>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            guild_id,
            state,
            deps,
            signals,
            cancel,
            generation: 0,
        }
    }

    /// Bucle del actor. Termina al cancelar el token o al cerrarse el buzón;
    /// cancelar descarta la operación en curso (y mata a yt-dlp).
    pub async fn run(mut self, mut inbox: UnboundedReceiver<PlaybackSignal>) {
        debug!("▶️ Motor de reproducción iniciado para guild {}", self.guild_id);
        let cancel = self.cancel.clone();

        loop {
            let signal = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                signal = inbox.recv() => match signal {
                    Some(signal) => signal,
                    None => break,
                },
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.handle(signal) => {}
            }
        }

        self.teardown().await;
    }

    async fn handle(&mut self, signal: PlaybackSignal) {
        match signal {
            PlaybackSignal::Start => {
                let phase = self.state.lock().phase;
                if phase != PlaybackPhase::Stopped {
                    debug!("Guild {} ya está en {:?}, se ignora el arranque", self.guild_id, phase);
                    return;
                }
                self.drive().await;
            }
            PlaybackSignal::Finished { generation, outcome } => {
                let phase = self.state.lock().phase;
                if phase != (PlaybackPhase::Streaming { generation }) {
                    debug!(
                        "Evento obsoleto (generación {}) en guild {} durante {:?}",
                        generation, self.guild_id, phase
                    );
                    return;
                }
                self.advance(outcome).await;
                self.drive().await;
            }
        }
    }

    async fn drive(&mut self) {
        while let Step::Continue = self.step().await {}
    }

    /// Un paso de la máquina: desde la cabeza actual hasta `Streaming`, o
    /// `Continue` si la cabeza se consumió y hay que mirar la siguiente.
    async fn step(&mut self) -> Step {
        let head = {
            let mut state = self.state.lock();
            match (state.queue.peek_head().cloned(), state.sink.clone()) {
                (None, sink) => {
                    state.phase = PlaybackPhase::Stopped;
                    state.queue.set_now_playing(None);
                    Head::Empty(sink)
                }
                (Some(_), None) => {
                    state.phase = PlaybackPhase::Stopped;
                    Head::NoSink
                }
                (Some(song), Some(sink)) => Head::Ready {
                    song,
                    revision: state.queue.revision(),
                    sink,
                },
            }
        };

        let (song, revision, sink) = match head {
            Head::Empty(sink) => {
                if let Some(sink) = sink {
                    sink.stop().await;
                }
                debug!("⏹️ Cola vacía en guild {}, motor detenido", self.guild_id);
                return Step::Halt;
            }
            Head::NoSink => {
                warn!("🔇 Guild {} sin sesión de voz; la cola espera", self.guild_id);
                return Step::Halt;
            }
            Head::Ready { song, revision, sink } => (song, revision, sink),
        };

        let song = if song.is_resolved() {
            song
        } else {
            match self.resolve_head(song, revision).await {
                Some(song) => song,
                None => return Step::Continue,
            }
        };

        let title = song.display_title();
        let url = song.source_url().unwrap_or_default().to_string();
        self.state.lock().queue.set_now_playing(Some(song));

        let downloaded = self.download_with_retry(&url).await;
        if !self.is_current(revision) {
            if let Ok(path) = downloaded {
                self.deps.temp_files.delete(Some(path)).await;
            }
            self.state.lock().pending_prefix = None;
            debug!("La cola de guild {} cambió durante la descarga", self.guild_id);
            return Step::Continue;
        }

        let path = match downloaded {
            Ok(path) => path,
            Err(failure) => {
                match &failure {
                    DownloadFailure::Restricted(e) => warn!("🚫 {} bloqueada: {}", title, e),
                    DownloadFailure::Exhausted { attempts, last } => {
                        warn!("❌ {} falló tras {} intentos: {:?}", title, attempts, last)
                    }
                }
                self.drop_head();
                self.notify(Notice::Skipped {
                    title,
                    reason: failure.reason(),
                })
                .await;
                return Step::Continue;
            }
        };
        {
            let mut state = self.state.lock();
            state.pending_prefix = None;
            state.active_temp_file = Some(path.clone());
        }

        let audio = match self.deps.decoder.open(&path).await {
            Ok(audio) => audio,
            Err(e) => {
                error!("❌ No se pudo abrir {}: {}", title, e);
                self.release_temp_file().await;
                self.drop_head();
                self.notify(Notice::Skipped {
                    title,
                    reason: SkipReason::Unplayable,
                })
                .await;
                return Step::Continue;
            }
        };

        self.generation += 1;
        let generation = self.generation;
        let listener = PlaybackListener::new(generation, self.signals.clone());
        self.set_phase(PlaybackPhase::Streaming { generation });

        match sink.play(audio, listener).await {
            Ok(()) => {
                info!("🎵 Reproduciendo en guild {}: {}", self.guild_id, title);
                self.notify(Notice::NowPlaying { title }).await;
                Step::Halt
            }
            Err(e) => {
                error!("❌ El sink rechazó {}: {}", title, e);
                self.advance(PlaybackOutcome::Errored(e.to_string())).await;
                Step::Continue
            }
        }
    }

    /// Resuelve la cabeza pendiente. `None` si se descartó o la cola cambió.
    async fn resolve_head(&mut self, song: SongRef, revision: u64) -> Option<SongRef> {
        self.set_phase(PlaybackPhase::Resolving);
        let query = song.search_query().unwrap_or_default();
        let result = self.deps.resolver.search(&query).await;

        if !self.is_current(revision) {
            return None;
        }

        match result {
            Ok(track) => {
                let resolved = song.resolve(track);
                debug!("🔗 Resuelta '{}' -> {:?}", query, resolved.source_url());
                self.state.lock().queue.replace_head(resolved.clone());
                Some(resolved)
            }
            Err(e) => {
                warn!("⚠️ Sin resultado para '{}' en guild {}: {}", query, self.guild_id, e);
                self.state.lock().queue.dequeue_head();
                self.notify(Notice::Skipped {
                    title: song.display_title(),
                    reason: SkipReason::NotFound,
                })
                .await;
                None
            }
        }
    }

    async fn download_with_retry(&mut self, url: &str) -> Result<PathBuf, DownloadFailure> {
        let attempts = self.deps.settings.download_attempts.max(1);
        let mut last = None;

        for attempt in 1..=attempts {
            self.set_phase(PlaybackPhase::Downloading { attempt });
            self.release_temp_file().await;

            let prefix = self.deps.temp_files.prefix_for(self.guild_id);
            self.state.lock().pending_prefix = Some(prefix.clone());

            // En caso de éxito el prefijo sigue pendiente hasta que el archivo tenga dueño
            match self.deps.resolver.download(url, &prefix).await {
                Ok(path) => return Ok(path),
                Err(e) => {
                    self.deps.temp_files.discard_prefix(&prefix).await;
                    self.state.lock().pending_prefix = None;
                    if !e.is_retryable() {
                        return Err(DownloadFailure::Restricted(e));
                    }

                    warn!("🔄 Descarga {}/{} fallida en guild {}: {}", attempt, attempts, self.guild_id, e);
                    last = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.deps.settings.retry_backoff).await;
                    }
                }
            }
        }

        Err(DownloadFailure::Exhausted { attempts, last })
    }

    /// Transición `Advancing` tras un evento terminal del sink
    async fn advance(&mut self, outcome: PlaybackOutcome) {
        self.set_phase(PlaybackPhase::Advancing);
        self.release_temp_file().await;

        match outcome {
            PlaybackOutcome::Ended => {
                let now_empty = {
                    let mut state = self.state.lock();
                    let consumed = match state.queue.loop_mode() {
                        LoopMode::Single => false,
                        LoopMode::Queue => {
                            state.queue.set_now_playing(None);
                            state.queue.rotate_head();
                            false
                        }
                        LoopMode::Off => {
                            state.queue.set_now_playing(None);
                            state.queue.dequeue_head().is_some()
                        }
                    };
                    consumed && state.queue.is_empty()
                };

                if now_empty {
                    info!("📭 Cola terminada en guild {}", self.guild_id);
                    self.notify(Notice::QueueEmpty).await;
                }
            }
            PlaybackOutcome::Errored(reason) => {
                let title = {
                    let mut state = self.state.lock();
                    let title = state
                        .queue
                        .now_playing()
                        .or(state.queue.peek_head())
                        .map(SongRef::display_title)
                        .unwrap_or_default();
                    if state.queue.loop_mode() != LoopMode::Single {
                        state.queue.dequeue_head();
                        state.queue.set_now_playing(None);
                    }
                    title
                };

                warn!("⚠️ Error de reproducción en guild {} ({}): {}", self.guild_id, title, reason);
                self.notify(Notice::PlaybackError { title, reason }).await;
                tokio::time::sleep(self.deps.settings.error_debounce).await;
            }
        }
    }

    fn drop_head(&self) {
        let mut state = self.state.lock();
        state.queue.dequeue_head();
        state.queue.set_now_playing(None);
    }

    /// Primero se vacía el campo, después se borra el archivo
    async fn release_temp_file(&self) {
        let path = self.state.lock().active_temp_file.take();
        self.deps.temp_files.delete(path).await;
    }

    fn is_current(&self, revision: u64) -> bool {
        self.state.lock().queue.revision() == revision
    }

    fn set_phase(&self, phase: PlaybackPhase) {
        self.state.lock().phase = phase;
    }

    async fn notify(&self, notice: Notice) {
        self.deps.notifier.notify(self.guild_id, notice).await;
    }

    /// También limpia la salida de una descarga interrumpida por la cancelación
    async fn teardown(&mut self) {
        let pending = {
            let mut state = self.state.lock();
            state.phase = PlaybackPhase::Stopped;
            state.pending_prefix.take()
        };
        if let Some(prefix) = pending {
            self.deps.temp_files.discard_prefix(&prefix).await;
        }
        self.release_temp_file().await;
        debug!("🛑 Motor de guild {} finalizado", self.guild_id);
    }
}
