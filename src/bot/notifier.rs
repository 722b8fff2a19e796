use dashmap::DashMap;
use serenity::{
    async_trait,
    builder::CreateMessage,
    http::Http,
    model::id::{ChannelId, GuildId},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    audio::notice::{Notice, Notifier},
    ui::embeds,
};

/// Publica los avisos del motor en el último canal de texto donde se usó
/// un comando de música en la guild.
pub struct ChannelNotifier {
    http: Arc<Http>,
    channels: DashMap<GuildId, ChannelId>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            channels: DashMap::new(),
        }
    }

    pub fn remember_channel(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.channels.insert(guild_id, channel_id);
    }

    pub fn forget(&self, guild_id: GuildId) {
        self.channels.remove(&guild_id);
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, guild_id: GuildId, notice: Notice) {
        let Some(channel_id) = self.channels.get(&guild_id).map(|c| *c) else {
            debug!("Sin canal de avisos para guild {}: {:?}", guild_id, notice);
            return;
        };

        let message = CreateMessage::new().embed(embeds::create_notice_embed(&notice));
        if let Err(e) = channel_id.send_message(&self.http, message).await {
            warn!("⚠️ No se pudo enviar aviso a guild {}: {:?}", guild_id, e);
        }
    }
}
