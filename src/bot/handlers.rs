use anyhow::Result;
use serenity::{
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
        EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use super::{voice, JukeboxBot};
use crate::{
    audio::queue::LoopMode,
    ui::embeds,
};

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &JukeboxBot) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        return reply(ctx, &command, "❌ Este comando sólo funciona en servidores", true).await;
    };

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );
    bot.notifier.remember_channel(guild_id, command.channel_id);

    match command.data.name.as_str() {
        "join" => handle_join(ctx, &command, bot, guild_id).await,
        "leave" => handle_leave(ctx, &command, bot, guild_id).await,
        "play" => handle_play(ctx, &command, bot, guild_id).await,
        "playlist" => handle_playlist(ctx, &command, bot, guild_id).await,
        "loop" => handle_loop(ctx, &command, bot, guild_id).await,
        "stop" => handle_stop(ctx, &command, bot, guild_id).await,
        "pause" => handle_pause(ctx, &command, bot, guild_id).await,
        "resume" => handle_resume(ctx, &command, bot, guild_id).await,
        "skip" => handle_skip(ctx, &command, bot, guild_id).await,
        "queue" => handle_queue(ctx, &command, bot, guild_id).await,
        _ => reply(ctx, &command, "❌ Comando no reconocido", true).await,
    }
}

// Handlers específicos para cada comando

async fn handle_join(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot, guild_id: GuildId) -> Result<()> {
    let Some(channel_id) = get_user_voice_channel(ctx, guild_id, command.user.id) else {
        return reply(ctx, command, "❌ Debes estar en un canal de voz", true).await;
    };

    connect(ctx, bot, guild_id, channel_id).await?;
    reply(ctx, command, "🔊 Conectado al canal de voz", false).await
}

async fn handle_leave(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot, guild_id: GuildId) -> Result<()> {
    bot.player.detach(guild_id).await;
    bot.notifier.forget(guild_id);
    voice::leave(ctx, guild_id).await?;

    reply(ctx, command, "👋 Desconectado del canal de voz", false).await
}

async fn handle_play(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot, guild_id: GuildId) -> Result<()> {
    let Some(query) = string_option(command, "query") else {
        return reply(ctx, command, "❌ Query no proporcionado", true).await;
    };

    // Defer la respuesta ya que puede tomar tiempo
    defer(ctx, command).await?;

    let song = match bot.requests.song(query).await {
        Ok(song) => song,
        Err(e) => {
            warn!("Solicitud '{}' rechazada en guild {}: {}", query, guild_id, e);
            return edit(ctx, command, embeds::create_error_embed("No se pudo agregar", &e.to_string())).await;
        }
    };

    if let Err(message) = ensure_session(ctx, command, bot, guild_id).await {
        return edit(ctx, command, embeds::create_error_embed("Sin conexión de voz", &message)).await;
    }

    let embed = match bot.player.enqueue(guild_id, song.clone()) {
        Ok(position) => embeds::create_track_added_embed(&song, position),
        Err(e) => embeds::create_error_embed("Cola llena", &e.to_string()),
    };
    edit(ctx, command, embed).await
}

async fn handle_playlist(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot, guild_id: GuildId) -> Result<()> {
    let Some(url) = string_option(command, "url") else {
        return reply(ctx, command, "❌ URL no proporcionada", true).await;
    };

    defer(ctx, command).await?;

    let songs = match bot.requests.playlist(url).await {
        Ok(songs) => songs,
        Err(e) => {
            warn!("Playlist '{}' rechazada en guild {}: {}", url, guild_id, e);
            return edit(ctx, command, embeds::create_error_embed("Error al cargar la playlist", &e.to_string())).await;
        }
    };

    if let Err(message) = ensure_session(ctx, command, bot, guild_id).await {
        return edit(ctx, command, embeds::create_error_embed("Sin conexión de voz", &message)).await;
    }

    let found = songs.len();
    let added = bot.player.enqueue_many(guild_id, songs);
    edit(ctx, command, embeds::create_playlist_added_embed(added, found)).await
}

async fn handle_loop(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot, guild_id: GuildId) -> Result<()> {
    let mode = match string_option(command, "mode").unwrap_or_default().parse::<LoopMode>() {
        Ok(mode) => mode,
        Err(e) => return reply(ctx, command, &format!("❌ {}", e), true).await,
    };

    bot.player.set_loop_mode(guild_id, mode);

    let message = match mode {
        LoopMode::Single => "🔂 Repetir canción activado",
        LoopMode::Queue => "🔁 Repetir cola activado",
        LoopMode::Off => "➡️ Repetición desactivada",
    };
    reply(ctx, command, message, false).await
}

async fn handle_stop(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot, guild_id: GuildId) -> Result<()> {
    let message = if bot.player.stop(guild_id).await {
        "⏹️ Reproducción detenida y cola limpiada"
    } else {
        "❌ No hay nada que detener"
    };
    reply(ctx, command, message, false).await
}

async fn handle_pause(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot, guild_id: GuildId) -> Result<()> {
    if bot.player.pause(guild_id).await {
        reply(ctx, command, "⏸️ Reproducción pausada", false).await
    } else {
        reply(ctx, command, "❌ No hay nada reproduciéndose", true).await
    }
}

async fn handle_resume(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot, guild_id: GuildId) -> Result<()> {
    if bot.player.resume(guild_id).await {
        reply(ctx, command, "▶️ Reproducción reanudada", false).await
    } else {
        reply(ctx, command, "❌ No hay nada pausado", true).await
    }
}

async fn handle_skip(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot, guild_id: GuildId) -> Result<()> {
    if bot.player.skip(guild_id).await {
        reply(ctx, command, "⏭️ Canción saltada", false).await
    } else {
        reply(ctx, command, "❌ No hay nada reproduciéndose", true).await
    }
}

async fn handle_queue(ctx: &Context, command: &CommandInteraction, bot: &JukeboxBot, guild_id: GuildId) -> Result<()> {
    let page = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "page")
        .and_then(|opt| opt.value.as_i64())
        .map_or(1, |page| page.max(1) as usize);

    let snapshot = bot.player.snapshot(guild_id);
    let embed = embeds::create_queue_embed(&snapshot, page);

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().embed(embed)),
        )
        .await?;

    Ok(())
}

// Funciones auxiliares

/// Conecta al canal del usuario si la guild aún no tiene sesión de voz
async fn ensure_session(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> std::result::Result<(), String> {
    if bot.player.has_session(guild_id) {
        return Ok(());
    }

    let channel_id = get_user_voice_channel(ctx, guild_id, command.user.id)
        .ok_or_else(|| "Debes estar en un canal de voz".to_string())?;

    connect(ctx, bot, guild_id, channel_id)
        .await
        .map_err(|e| e.to_string())
}

async fn connect(ctx: &Context, bot: &JukeboxBot, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
    let sink = voice::join(ctx, guild_id, channel_id, bot.config.default_volume).await?;
    bot.player.attach_sink(guild_id, sink);
    Ok(())
}

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

async fn reply(ctx: &Context, command: &CommandInteraction, content: &str, ephemeral: bool) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;

    Ok(())
}

async fn defer(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    Ok(())
}

async fn edit(ctx: &Context, command: &CommandInteraction, embed: CreateEmbed) -> Result<()> {
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;

    Ok(())
}
