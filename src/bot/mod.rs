//! # Bot Module
//!
//! Discord-facing layer for Encore.
//!
//! This module contains no playback state of its own: it registers slash
//! commands, resolves the invoking user's voice channel, dispatches each
//! interaction to the [`PlayerManager`] and renders the typed result (or
//! error) as a reply. Everything stateful lives in [`crate::audio`].
//!
//! ## Event flow
//!
//! - `ready`: registers commands (globally, or per-guild when `GUILD_ID`
//!   is configured for development)
//! - `interaction_create`: dispatches slash commands via [`handlers`]
//! - `voice_state_update`: tears the session down when the bot is kicked
//!   from its voice channel

use serenity::{
    all::{Context, EventHandler, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info};

pub mod commands;
pub mod handlers;

use crate::{audio::player::PlayerManager, config::Config};

/// Handler principal del bot: configuración compartida y orquestador.
pub struct EncoreBot {
    config: Arc<Config>,
    pub player: Arc<PlayerManager>,
}

impl EncoreBot {
    pub fn new(config: Arc<Config>, player: Arc<PlayerManager>) -> Self {
        Self { config, player }
    }

    async fn register_commands(&self, ctx: &Context) -> anyhow::Result<()> {
        match self.config.guild_id {
            Some(guild_id) => {
                info!("🏠 Registrando comandos para la guild de desarrollo {}", guild_id);
                commands::register_guild_commands(ctx, guild_id.into()).await?;
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for EncoreBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// El gateway avisa cuando el bot sale de un canal de voz (expulsión o
    /// desconexión manual): la sesión no debe sobrevivir a la conexión.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;

        if new.user_id == current_user_id && old.is_some() && new.channel_id.is_none() {
            if let Some(guild_id) = new.guild_id {
                info!("🔌 Bot desconectado del canal de voz en guild {}", guild_id);
                self.player.forced_disconnect(guild_id).await;
            }
        }
    }
}
