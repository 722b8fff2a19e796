use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::audio::{
    notice::{Notice, SkipReason},
    queue::{LoopMode, QueuePage, QueueSnapshot, SongRef},
};

/// Canciones por página en `/queue`
pub const QUEUE_PAGE_SIZE: usize = 10;

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Open Jukebox";

/// Embed para un aviso del motor de reproducción
pub fn create_notice_embed(notice: &Notice) -> CreateEmbed {
    match notice {
        Notice::NowPlaying { title } => create_now_playing_embed(title),
        Notice::Skipped { title, reason } => CreateEmbed::default()
            .title("⏭️ Canción Omitida")
            .description(format!("**{}**\n{}", title, skip_reason_text(reason)))
            .color(colors::WARNING_ORANGE)
            .timestamp(Timestamp::now())
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER)),
        Notice::PlaybackError { title, reason } => CreateEmbed::default()
            .title("❌ Error de Reproducción")
            .description(format!("**{}**\n`{}`", title, reason))
            .color(colors::ERROR_RED)
            .timestamp(Timestamp::now())
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER)),
        Notice::QueueEmpty => CreateEmbed::default()
            .title("📭 Cola Terminada")
            .description("No quedan canciones.\n\n💡 Usa `/play <canción>` para agregar música")
            .color(colors::NEUTRAL_GRAY)
            .timestamp(Timestamp::now())
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER)),
    }
}

pub fn create_now_playing_embed(title: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!("**{}**", title))
        .color(colors::SUCCESS_GREEN)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para mostrar que se agregó una canción
pub fn create_track_added_embed(song: &SongRef, queue_len: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("✅ Canción Agregada")
        .description(format!("**{}** se ha agregado a la cola", song.display_title()))
        .color(colors::SUCCESS_GREEN)
        .field("📋 Posición", queue_len.to_string(), true);

    if let Some(url) = song.source_url() {
        embed = embed.url(url);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new("🎵 Se reproducirá automáticamente si no hay música sonando"))
}

/// Crea un embed para mostrar que una playlist fue agregada
pub fn create_playlist_added_embed(added: usize, found: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("📋 Playlist Agregada")
        .description(format!("Se agregaron **{} canciones** a la cola", added))
        .color(colors::MUSIC_PURPLE);

    if added < found {
        embed = embed.field(
            "⚠️ Cola llena",
            format!("{} canciones no entraron", found - added),
            false,
        );
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para mostrar la cola de reproducción
pub fn create_queue_embed(snapshot: &QueueSnapshot, page: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    if snapshot.items.is_empty() && snapshot.now_playing.is_none() {
        return embed
            .description("😴 **La cola está vacía**\n\n💡 Usa `/play <canción>` para agregar música")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
            .timestamp(Timestamp::now());
    }

    if let Some(current) = &snapshot.now_playing {
        embed = embed.field(
            format!("{} Reproduciendo", loop_icon(snapshot.loop_mode)),
            format!("**{}**", current.display_title()),
            false,
        );
    }

    let queue_page = snapshot.page(page, QUEUE_PAGE_SIZE);
    if !queue_page.items.is_empty() {
        embed = embed.field("En cola", queue_lines(&queue_page), false);
    }

    embed = embed.field(
        "Información",
        format!(
            "**Total:** {} canciones • **Repetición:** {}",
            snapshot.items.len(),
            snapshot.loop_mode
        ),
        false,
    );

    let footer = if queue_page.total_pages > 1 {
        format!(
            "Página {} de {} • Open Jukebox",
            queue_page.current_page, queue_page.total_pages
        )
    } else {
        STANDARD_FOOTER.to_string()
    };

    embed
        .footer(CreateEmbedFooter::new(footer))
        .timestamp(Timestamp::now())
}

/// Crea un embed de error
pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn skip_reason_text(reason: &SkipReason) -> String {
    match reason {
        SkipReason::NotFound => "🔍 No se encontró un resultado para esta canción".to_string(),
        SkipReason::Restricted => "🚫 El proveedor bloqueó la descarga (verificación anti-bot)".to_string(),
        SkipReason::DownloadFailed { attempts } => {
            format!("📥 La descarga falló tras {} intentos", attempts)
        }
        SkipReason::Unplayable => "🔇 El archivo descargado no se pudo reproducir".to_string(),
    }
}

fn queue_lines(page: &QueuePage) -> String {
    page.items
        .iter()
        .enumerate()
        .map(|(i, song)| {
            let pending = if song.is_resolved() { "" } else { " 🔎" };
            format!("**{}**. {}{}", page.first_index + i + 1, song.display_title(), pending)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn loop_icon(mode: LoopMode) -> &'static str {
    match mode {
        LoopMode::Single => "🔂",
        LoopMode::Queue => "🔁",
        LoopMode::Off => "▶️",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn queue_lines_are_numbered_from_the_page_offset() {
        let snapshot = QueueSnapshot {
            now_playing: None,
            items: (1..=12)
                .map(|n| SongRef::resolved(format!("song {}", n), format!("https://x/{}", n)))
                .chain(std::iter::once(SongRef::unresolved("Queen", "Under Pressure")))
                .collect(),
            loop_mode: LoopMode::Off,
        };

        let lines = queue_lines(&snapshot.page(2, QUEUE_PAGE_SIZE));
        assert_eq!(
            lines,
            "**11**. song 11\n**12**. song 12\n**13**. Queen - Under Pressure 🔎"
        );
    }

    #[test]
    fn skip_reasons_name_the_category() {
        assert!(skip_reason_text(&SkipReason::Restricted).contains("anti-bot"));
        assert!(skip_reason_text(&SkipReason::DownloadFailed { attempts: 3 }).contains("3 intentos"));
    }
}
