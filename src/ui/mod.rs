//! Discord presentation: embeds for replies and playback notices.

pub mod embeds;
