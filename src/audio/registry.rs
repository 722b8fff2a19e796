use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tokio::{
    sync::mpsc::{self, UnboundedSender},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{
    engine::{EngineDeps, GuildState, PlaybackEngine, SharedGuildState},
    sink::PlaybackSignal,
};

/// Estado de una guild más el buzón y la tarea de su motor
pub struct GuildHandle {
    pub guild_id: GuildId,
    pub state: SharedGuildState,
    signals: UnboundedSender<PlaybackSignal>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl GuildHandle {
    /// Pide al motor que arranque; lo ignora si no está detenido
    pub fn start(&self) {
        if self.signals.send(PlaybackSignal::Start).is_err() {
            debug!("Motor de guild {} ya finalizado", self.guild_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn send(&self, signal: PlaybackSignal) {
        let _ = self.signals.send(signal);
    }

    /// Cancela el motor y espera a que libere sus recursos
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

/// Mapa guild -> estado, con creación perezosa y baja explícita
pub struct GuildRegistry {
    guilds: DashMap<GuildId, Arc<GuildHandle>>,
    deps: Arc<EngineDeps>,
}

impl GuildRegistry {
    pub fn new(deps: EngineDeps) -> Self {
        Self {
            guilds: DashMap::new(),
            deps: Arc::new(deps),
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildHandle>> {
        self.guilds.get(&guild_id).map(|h| h.clone())
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildHandle> {
        self.guilds
            .entry(guild_id)
            .or_insert_with(|| self.spawn(guild_id))
            .clone()
    }

    /// Da de baja la guild y detiene su motor
    pub async fn remove(&self, guild_id: GuildId) -> bool {
        let Some((_, handle)) = self.guilds.remove(&guild_id) else {
            return false;
        };

        handle.shutdown().await;
        info!("🗑️ Estado de guild {} descartado", guild_id);
        true
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.guilds.len()
    }

    fn spawn(&self, guild_id: GuildId) -> Arc<GuildHandle> {
        let state = Arc::new(Mutex::new(GuildState::new(self.deps.settings.max_queue_size)));
        let (signals, inbox) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let engine = PlaybackEngine::new(
            guild_id,
            state.clone(),
            self.deps.clone(),
            signals.clone(),
            cancel.clone(),
        );
        let task = tokio::spawn(engine.run(inbox));
        debug!("🆕 Estado creado para guild {}", guild_id);

        Arc::new(GuildHandle {
            guild_id,
            state,
            signals,
            cancel,
            task: Mutex::new(Some(task)),
        })
    }
}
