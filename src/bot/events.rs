use serenity::{async_trait, model::id::GuildId};
use songbird::{
    tracks::PlayMode, Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler,
};
use tracing::{debug, error, warn};

use crate::audio::sink::{PlaybackListener, PlaybackOutcome};

/// Handler para cuando termina un track (fin natural, stop o skip).
/// Se da de baja al dispararse.
pub struct TrackEndHandler {
    pub guild_id: GuildId,
    pub listener: PlaybackListener,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if self.listener.fire(PlaybackOutcome::Ended) {
            debug!(
                "🎵 Track terminó en guild {} (generación {})",
                self.guild_id,
                self.listener.generation()
            );
        }

        Some(VoiceEvent::Cancel)
    }
}

/// Handler para errores de tracks
pub struct TrackErrorHandler {
    pub guild_id: GuildId,
    pub listener: PlaybackListener,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let reason = match ctx {
            EventContext::Track(track_list) => track_list
                .iter()
                .find_map(|(state, _handle)| match &state.playing {
                    PlayMode::Errored(e) => Some(e.to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| "error desconocido del reproductor".to_string()),
            _ => "error desconocido del reproductor".to_string(),
        };

        error!("❌ Error en track para guild {}: {}", self.guild_id, reason);
        self.listener.fire(PlaybackOutcome::Errored(reason));

        Some(VoiceEvent::Cancel)
    }
}

/// Handler para desconexiones del driver de voz
pub struct DriverDisconnectHandler {
    pub guild_id: GuildId,
}

#[async_trait]
impl VoiceEventHandler for DriverDisconnectHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let EventContext::DriverDisconnect(data) = ctx {
            warn!(
                "🔌 Driver de voz desconectado en guild {}: {:?}",
                self.guild_id, data.reason
            );
        }

        None
    }
}
