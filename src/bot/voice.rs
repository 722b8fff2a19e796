use anyhow::Result;
use parking_lot::Mutex;
use serenity::{
    async_trait,
    model::id::{ChannelId, GuildId},
    prelude::Context,
};
use songbird::{
    error::JoinError,
    events::CoreEvent,
    tracks::{ControlError, TrackHandle},
    Call, Event as VoiceEvent, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::events::{DriverDisconnectHandler, TrackEndHandler, TrackErrorHandler};
use crate::{
    audio::{
        decoder::DecodedAudio,
        sink::{AudioSink, PlaybackListener},
    },
    error::SinkError,
};

/// Sink de audio sobre una llamada de songbird
pub struct SongbirdSink {
    guild_id: GuildId,
    call: Arc<tokio::sync::Mutex<Call>>,
    current: Mutex<Option<TrackHandle>>,
    volume: f32,
}

impl SongbirdSink {
    pub fn new(guild_id: GuildId, call: Arc<tokio::sync::Mutex<Call>>, volume: f32) -> Self {
        Self {
            guild_id,
            call,
            current: Mutex::new(None),
            volume,
        }
    }

    fn current(&self) -> Option<TrackHandle> {
        self.current.lock().clone()
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn play(&self, audio: DecodedAudio, listener: PlaybackListener) -> Result<(), SinkError> {
        let handle = {
            let mut call = self.call.lock().await;
            if call.current_connection().is_none() {
                return Err(SinkError::NotConnected);
            }
            call.play_only_input(audio.input)
        };

        let player_error = |e: ControlError| SinkError::Player(e.to_string());
        handle.set_volume(self.volume).map_err(player_error)?;
        handle
            .add_event(
                VoiceEvent::Track(TrackEvent::End),
                TrackEndHandler {
                    guild_id: self.guild_id,
                    listener: listener.clone(),
                },
            )
            .map_err(player_error)?;
        handle
            .add_event(
                VoiceEvent::Track(TrackEvent::Error),
                TrackErrorHandler {
                    guild_id: self.guild_id,
                    listener,
                },
            )
            .map_err(player_error)?;

        debug!("🔊 Pista enviada al driver en guild {}", self.guild_id);
        *self.current.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) {
        let handle = self.current.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.stop() {
                debug!("Pista ya detenida en guild {}: {}", self.guild_id, e);
            }
        }
    }

    async fn pause(&self) -> bool {
        self.current().is_some_and(|h| h.pause().is_ok())
    }

    async fn resume(&self) -> bool {
        self.current().is_some_and(|h| h.play().is_ok())
    }
}

/// Conecta al canal de voz y devuelve el sink de la llamada
pub async fn join(
    ctx: &Context,
    guild_id: GuildId,
    channel_id: ChannelId,
    volume: f32,
) -> Result<Arc<SongbirdSink>> {
    let manager = songbird::get(ctx)
        .await
        .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

    let call = manager.join(guild_id, channel_id).await.map_err(|e| {
        warn!("Error al conectar en guild {}: {:?}", guild_id, e);
        anyhow::anyhow!("Error al conectar al canal de voz")
    })?;

    {
        let mut handler = call.lock().await;
        handler.remove_all_global_events();
        handler.add_global_event(
            VoiceEvent::Core(CoreEvent::DriverDisconnect),
            DriverDisconnectHandler { guild_id },
        );
    }

    info!("🔊 Conectado al canal de voz en guild {}", guild_id);
    Ok(Arc::new(SongbirdSink::new(guild_id, call, volume)))
}

/// Sale del canal de voz; no es un error si no había llamada
pub async fn leave(ctx: &Context, guild_id: GuildId) -> Result<()> {
    let manager = songbird::get(ctx)
        .await
        .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

    match manager.remove(guild_id).await {
        Ok(()) | Err(JoinError::NoCall) => {
            info!("👋 Desconectado del canal de voz en guild {}", guild_id);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
