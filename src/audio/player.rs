use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::info;

use super::{
    engine::{EngineDeps, PlaybackPhase},
    queue::{LoopMode, QueueSnapshot, SongRef},
    registry::{GuildHandle, GuildRegistry},
    sink::AudioSink,
};
use crate::error::QueueError;

/// Fachada que usan los comandos: muta la cola y arranca el motor si está libre
pub struct AudioPlayer {
    registry: GuildRegistry,
}

impl AudioPlayer {
    pub fn new(deps: EngineDeps) -> Self {
        Self {
            registry: GuildRegistry::new(deps),
        }
    }

    /// Asocia la sesión de voz de la guild y retoma la cola si había algo
    pub fn attach_sink(&self, guild_id: GuildId, sink: Arc<dyn AudioSink>) {
        let handle = self.registry.get_or_create(guild_id);
        handle.state.lock().sink = Some(sink);
        self.start_if_idle(&handle);
    }

    pub fn has_session(&self, guild_id: GuildId) -> bool {
        self.registry
            .get(guild_id)
            .is_some_and(|h| h.state.lock().sink.is_some())
    }

    /// Descarta todo el estado de la guild (comando leave o desconexión)
    pub async fn detach(&self, guild_id: GuildId) -> bool {
        self.registry.remove(guild_id).await
    }

    /// Agrega una canción y devuelve la nueva longitud de la cola
    pub fn enqueue(&self, guild_id: GuildId, song: SongRef) -> Result<usize, QueueError> {
        let handle = self.registry.get_or_create(guild_id);
        let len = handle.state.lock().queue.enqueue(song)?;
        self.start_if_idle(&handle);
        Ok(len)
    }

    /// Agrega varias canciones en orden; devuelve cuántas entraron
    pub fn enqueue_many(&self, guild_id: GuildId, songs: Vec<SongRef>) -> usize {
        let handle = self.registry.get_or_create(guild_id);
        let added = handle.state.lock().queue.enqueue_many(songs);
        if added > 0 {
            self.start_if_idle(&handle);
        }
        added
    }

    pub fn set_loop_mode(&self, guild_id: GuildId, mode: LoopMode) {
        let handle = self.registry.get_or_create(guild_id);
        handle.state.lock().queue.set_loop_mode(mode);
    }

    pub fn snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        let handle = self.registry.get_or_create(guild_id);
        let snapshot = handle.state.lock().queue.snapshot();
        snapshot
    }

    pub fn is_idle(&self, guild_id: GuildId) -> bool {
        self.registry
            .get(guild_id)
            .map_or(true, |h| h.state.lock().is_idle())
    }

    /// Pausa la reproducción actual
    pub async fn pause(&self, guild_id: GuildId) -> bool {
        match self.streaming_sink(guild_id) {
            Some(sink) => sink.pause().await,
            None => false,
        }
    }

    /// Reanuda la reproducción
    pub async fn resume(&self, guild_id: GuildId) -> bool {
        match self.streaming_sink(guild_id) {
            Some(sink) => sink.resume().await,
            None => false,
        }
    }

    /// Detiene la pista actual; el motor avanza según el modo de repetición
    pub async fn skip(&self, guild_id: GuildId) -> bool {
        let Some(sink) = self.streaming_sink(guild_id) else {
            return false;
        };
        info!("⏭️ Saltando canción en guild {}", guild_id);
        sink.stop().await;
        true
    }

    /// Vacía la cola y detiene el sink; el motor ve la cola vacía y se para
    pub async fn stop(&self, guild_id: GuildId) -> bool {
        let Some(handle) = self.registry.get(guild_id) else {
            return false;
        };

        let sink = {
            let mut state = handle.state.lock();
            state.queue.clear();
            state.sink.clone()
        };

        if let Some(sink) = sink {
            sink.stop().await;
        }
        info!("⏹️ Reproducción detenida en guild {}", guild_id);
        true
    }

    fn streaming_sink(&self, guild_id: GuildId) -> Option<Arc<dyn AudioSink>> {
        let handle = self.registry.get(guild_id)?;
        let state = handle.state.lock();
        let sink = match state.phase {
            PlaybackPhase::Streaming { .. } => state.sink.clone(),
            _ => None,
        };
        sink
    }

    fn start_if_idle(&self, handle: &GuildHandle) {
        if handle.state.lock().is_idle() {
            handle.start();
        }
    }

    #[cfg(test)]
    pub(crate) fn handle(&self, guild_id: GuildId) -> Arc<GuildHandle> {
        self.registry.get_or_create(guild_id)
    }

    #[cfg(test)]
    pub(crate) fn guild_count(&self) -> usize {
        self.registry.len()
    }
}
