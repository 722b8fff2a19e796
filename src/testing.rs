//! Fakes shared by the playback tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tempfile::TempDir;

use crate::{
    audio::{
        decoder::{AudioDecoder, DecodePath, DecodedAudio, SymphoniaDecoder},
        engine::{EngineDeps, PlaybackSettings},
        notice::{Notice, Notifier},
        sink::{AudioSink, PlaybackListener, PlaybackOutcome},
        tempfile::TempFileManager,
        AudioPlayer,
    },
    error::{DecodeError, DownloadError, ResolutionError, SinkError},
    sources::{MediaResolver, ResolvedTrack},
};

pub const GUILD: GuildId = GuildId::new(1);

/// Resultado programado de un intento de descarga
#[derive(Debug, Clone, Copy)]
pub enum FakeDownload {
    Ok,
    Fail,
    AntiBot,
    /// Nunca termina; sirve para probar la cancelación
    Hang,
    /// Escribe parte del archivo y luego se queda colgada
    PartialHang,
}

#[derive(Default)]
pub struct FakeResolver {
    lookups: Mutex<HashMap<String, ResolvedTrack>>,
    searches: Mutex<HashMap<String, ResolvedTrack>>,
    script: Mutex<HashMap<String, VecDeque<FakeDownload>>>,
    attempts: Mutex<HashMap<String, u32>>,
    search_calls: AtomicUsize,
}

impl FakeResolver {
    pub fn with_search(self, query: &str, title: &str, url: &str) -> Self {
        self.searches.lock().insert(query.to_string(), track(title, url));
        self
    }

    pub fn with_lookup(self, url: &str, title: &str) -> Self {
        self.lookups.lock().insert(url.to_string(), track(title, url));
        self
    }

    /// Los intentos más allá del guion descargan con éxito
    pub fn with_script(self, url: &str, steps: &[FakeDownload]) -> Self {
        self.script
            .lock()
            .insert(url.to_string(), steps.iter().copied().collect());
        self
    }

    pub fn attempts(&self, url: &str) -> u32 {
        self.attempts.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.lock().values().sum()
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaResolver for FakeResolver {
    async fn lookup_metadata(&self, url: &str) -> Result<ResolvedTrack, ResolutionError> {
        self.lookups
            .lock()
            .get(url)
            .cloned()
            .ok_or(ResolutionError::NoOutput)
    }

    async fn search(&self, query: &str) -> Result<ResolvedTrack, ResolutionError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.searches
            .lock()
            .get(query)
            .cloned()
            .ok_or_else(|| ResolutionError::NoMatch(query.to_string()))
    }

    async fn download(&self, url: &str, dest_prefix: &Path) -> Result<PathBuf, DownloadError> {
        *self.attempts.lock().entry(url.to_string()).or_default() += 1;
        let step = self
            .script
            .lock()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or(FakeDownload::Ok);

        match step {
            FakeDownload::Ok => {
                let path = PathBuf::from(format!("{}.webm", dest_prefix.display()));
                tokio::fs::write(&path, vec![0x42; 2048]).await?;
                Ok(path)
            }
            FakeDownload::Fail => Err(DownloadError::ExitCode {
                code: Some(1),
                stderr: "ERROR: HTTP Error 403: Forbidden".into(),
            }),
            FakeDownload::AntiBot => Err(DownloadError::AntiBot(
                "Sign in to confirm you're not a bot".into(),
            )),
            FakeDownload::Hang => std::future::pending().await,
            FakeDownload::PartialHang => {
                let path = PathBuf::from(format!("{}.webm", dest_prefix.display()));
                tokio::fs::write(&path, vec![0x42; 512]).await?;
                std::future::pending().await
            }
        }
    }
}

/// Sink en memoria: guarda el oyente pendiente para que el test decida
/// cuándo termina la pista.
#[derive(Default)]
pub struct FakeSink {
    pending: Mutex<Option<PlaybackListener>>,
    plays: Mutex<Vec<DecodePath>>,
    stops: AtomicUsize,
    paused: AtomicBool,
    fail_next_play: AtomicBool,
}

impl FakeSink {
    pub fn play_count(&self) -> usize {
        self.plays.lock().len()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn fail_next_play(&self) {
        self.fail_next_play.store(true, Ordering::SeqCst);
    }

    /// Termina la pista actual como lo haría el driver de voz
    pub fn finish(&self, outcome: PlaybackOutcome) {
        let listener = self.pending.lock().take();
        if let Some(listener) = listener {
            listener.fire(outcome);
        }
    }
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn play(&self, audio: DecodedAudio, listener: PlaybackListener) -> Result<(), SinkError> {
        if self.fail_next_play.swap(false, Ordering::SeqCst) {
            return Err(SinkError::Player("driver caído".into()));
        }
        self.plays.lock().push(audio.decode_path);
        self.paused.store(false, Ordering::SeqCst);
        *self.pending.lock() = Some(listener);
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.finish(PlaybackOutcome::Ended);
    }

    async fn pause(&self) -> bool {
        !self.paused.swap(true, Ordering::SeqCst)
    }

    async fn resume(&self) -> bool {
        self.paused.swap(false, Ordering::SeqCst)
    }
}

/// Rechaza todo archivo, como un contenedor corrupto que ni siquiera abre
pub struct RejectingDecoder;

#[async_trait]
impl AudioDecoder for RejectingDecoder {
    async fn open(&self, path: &Path) -> Result<DecodedAudio, DecodeError> {
        Err(DecodeError {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "contenedor corrupto"),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn count(&self, wanted: &Notice) -> usize {
        self.notices.lock().iter().filter(|n| *n == wanted).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, _guild_id: GuildId, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

pub struct Harness {
    pub player: AudioPlayer,
    pub resolver: Arc<FakeResolver>,
    pub sink: Arc<FakeSink>,
    pub notifier: Arc<RecordingNotifier>,
    pub scratch: TempDir,
}

impl Harness {
    pub fn new(resolver: FakeResolver) -> Self {
        Self::with_decoder(resolver, Arc::new(SymphoniaDecoder))
    }

    pub fn with_decoder(resolver: FakeResolver, decoder: Arc<dyn AudioDecoder>) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let resolver = Arc::new(resolver);
        let notifier = Arc::new(RecordingNotifier::default());

        let deps = EngineDeps {
            resolver: resolver.clone(),
            decoder,
            notifier: notifier.clone(),
            temp_files: TempFileManager::new(scratch.path()),
            settings: PlaybackSettings {
                download_attempts: 3,
                retry_backoff: Duration::ZERO,
                error_debounce: Duration::ZERO,
                max_queue_size: 100,
            },
        };

        Self {
            player: AudioPlayer::new(deps),
            resolver,
            sink: Arc::new(FakeSink::default()),
            notifier,
            scratch,
        }
    }

    /// Con la sesión de voz ya asociada
    pub fn connected(resolver: FakeResolver) -> Self {
        let harness = Self::new(resolver);
        harness.player.attach_sink(GUILD, harness.sink.clone());
        harness
    }

    pub fn scratch_files(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }

    /// El único archivo en disco es el de la canción que suena
    pub fn assert_only_active_file(&self) {
        let active = self.player.handle(GUILD).state.lock().active_temp_file.clone();
        let active = active.expect("debería haber un archivo activo");
        assert!(active.exists(), "{} no existe", active.display());
        assert_eq!(self.scratch_files(), 1);
    }
}

pub fn track(title: &str, url: &str) -> ResolvedTrack {
    ResolvedTrack {
        title: title.to_string(),
        url: url.to_string(),
    }
}

pub fn url(n: usize) -> String {
    format!("https://www.youtube.com/watch?v=song{:07}", n)
}

/// Espera (hasta 2 s) a que se cumpla la condición
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condición no alcanzada: {}", what);
}
