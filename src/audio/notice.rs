use async_trait::async_trait;
use serenity::model::id::GuildId;

/// Motivo por el que una canción se saltó sin sonar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// La búsqueda no devolvió un resultado válido
    NotFound,
    /// Bloqueo anti-bot del proveedor
    Restricted,
    DownloadFailed { attempts: u32 },
    /// El archivo descargado no se pudo abrir
    Unplayable,
}

/// Avisos que el motor publica en el canal de la guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NowPlaying { title: String },
    Skipped { title: String, reason: SkipReason },
    PlaybackError { title: String, reason: String },
    QueueEmpty,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, guild_id: GuildId, notice: Notice);
}
