//! # Bot Module
//!
//! Discord front end of Open Jukebox.
//!
//! - [`commands`]: slash-command definitions and registration
//! - [`handlers`]: one reply per command, `play`/`playlist` defer then edit
//! - [`voice`]: songbird calls and the [`voice::SongbirdSink`] audio sink
//! - [`events`]: songbird track/driver event handlers
//! - [`notifier`]: playback notices posted to the guild's text channel
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`] and owns the
//! command-facing [`AudioPlayer`].

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;
pub mod notifier;
pub mod voice;

use crate::{
    audio::AudioPlayer,
    config::Config,
    sources::{RequestResolver, YtDlpResolver},
};
use notifier::ChannelNotifier;

/// Handler de eventos de Discord.
///
/// Todo el estado por guild vive en [`AudioPlayer`]; aquí sólo quedan las
/// dependencias compartidas por los comandos.
pub struct JukeboxBot {
    pub config: Arc<Config>,
    pub player: Arc<AudioPlayer>,
    pub requests: Arc<RequestResolver>,
    pub notifier: Arc<ChannelNotifier>,
    ytdlp: Arc<YtDlpResolver>,
    maintenance_started: AtomicBool,
}

impl JukeboxBot {
    pub fn new(
        config: Config,
        player: Arc<AudioPlayer>,
        requests: Arc<RequestResolver>,
        notifier: Arc<ChannelNotifier>,
        ytdlp: Arc<YtDlpResolver>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            player,
            requests,
            notifier,
            ytdlp,
            maintenance_started: AtomicBool::new(false),
        }
    }

    /// Registra los comandos por guild (desarrollo, propagación inmediata) o
    /// globalmente según `GUILD_ID`.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await.map_err(|e| {
                    error!("❌ Error registrando comandos de guild: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica el permiso 'applications.commands'.")
                })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica el permiso 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        // ready se repite en cada reconexión
        if self.maintenance_started.swap(true, Ordering::AcqRel) {
            return;
        }
        let ytdlp = self.ytdlp.clone();
        tokio::spawn(async move {
            maintenance_tasks(ytdlp).await;
        });
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Si alguien desconecta al bot del canal, se descarta el estado de la guild
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else { return };
        if self.player.detach(guild_id).await {
            info!("🔌 Bot desconectado externamente en guild {}, estado limpiado", guild_id);
        }
        self.notifier.forget(guild_id);

        if let Err(e) = voice::leave(&ctx, guild_id).await {
            warn!("Error al cerrar la llamada en guild {}: {:?}", guild_id, e);
        }
    }
}

/// Comprueba cada hora que yt-dlp siga disponible
async fn maintenance_tasks(ytdlp: Arc<YtDlpResolver>) {
    let mut interval = tokio::time::interval(Duration::from_secs(3600));

    loop {
        interval.tick().await;

        if let Err(e) = ytdlp.verify_dependencies().await {
            warn!("Error verificando dependencias: {:?}", e);
        }
    }
}
