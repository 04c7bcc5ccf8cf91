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
use tracing::info;

use crate::{
    audio::{player::PlayOutcome, track::LoopMode},
    bot::EncoreBot,
    error::MusicError,
    ui::embeds,
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        respond_text(ctx, &command, "❌ Este comando solo funciona dentro de un servidor").await?;
        return Ok(());
    };

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, command, bot, guild_id).await,
        "stop" => handle_stop(ctx, command, bot, guild_id).await,
        "resume" => handle_resume(ctx, command, bot, guild_id).await,
        "skip" => handle_skip(ctx, command, bot, guild_id).await,
        "queue" => handle_queue(ctx, command, bot, guild_id).await,
        "nowplaying" => handle_nowplaying(ctx, command, bot, guild_id).await,
        "shuffle" => handle_shuffle(ctx, command, bot, guild_id).await,
        "clear" => handle_clear(ctx, command, bot, guild_id).await,
        "removeduplicates" => handle_remove_duplicates(ctx, command, bot, guild_id).await,
        "loop" => handle_loop(ctx, command, bot, guild_id).await,
        "disconnect" => handle_disconnect(ctx, command, bot, guild_id).await,
        _ => respond_text(ctx, &command, "❌ Comando no reconocido").await,
    }
}

// Handlers específicos para cada comando

async fn handle_play(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(url) = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "url")
        .and_then(|opt| opt.value.as_str())
        .map(str::to_string)
    else {
        return respond_text(ctx, &command, "❌ Falta la URL").await;
    };

    // La resolución puede tardar: defer antes de trabajar.
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    // Sin sesión todavía: el join corre primero, con el canal de voz del
    // usuario que invocó.
    let reply = if bot.player.is_active(guild_id) {
        play_reply(bot, guild_id, &url, command.user.id).await
    } else {
        match user_voice_channel(ctx, guild_id, command.user.id) {
            None => error_reply(&MusicError::VoiceChannelRequired),
            Some(channel_id) => match bot.player.join(guild_id, channel_id).await {
                Err(e) => error_reply(&e),
                Ok(()) => play_reply(bot, guild_id, &url, command.user.id).await,
            },
        }
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(reply))
        .await?;
    Ok(())
}

async fn play_reply(bot: &EncoreBot, guild_id: GuildId, url: &str, user: UserId) -> String {
    match bot.player.play(guild_id, url, user).await {
        Ok(PlayOutcome::Started { track, queued: 0 }) => {
            format!("▶️ Reproduciendo **{}**", track.title)
        }
        Ok(PlayOutcome::Started { track, queued }) => {
            format!(
                "▶️ Reproduciendo **{}** y {} más agregadas a la cola",
                track.title, queued
            )
        }
        Ok(PlayOutcome::Queued { first, queued: 1 }) => {
            format!("➕ **{}** agregado a la cola", first.title)
        }
        Ok(PlayOutcome::Queued { first, queued }) => {
            format!(
                "➕ {} canciones agregadas a la cola, empezando por **{}**",
                queued, first.title
            )
        }
        Err(e) => error_reply(&e),
    }
}

async fn handle_stop(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    let reply = match bot.player.stop(guild_id).await {
        Ok(()) => "⏸️ Reproducción pausada".to_string(),
        Err(e) => error_reply(&e),
    };
    respond_text(ctx, &command, &reply).await
}

async fn handle_resume(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    let reply = match bot.player.resume(guild_id).await {
        Ok(()) => "▶️ Reproducción reanudada".to_string(),
        Err(e) => error_reply(&e),
    };
    respond_text(ctx, &command, &reply).await
}

async fn handle_skip(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    let reply = match bot.player.skip(guild_id).await {
        Ok(()) => "⏭️ Track saltado".to_string(),
        Err(e) => error_reply(&e),
    };
    respond_text(ctx, &command, &reply).await
}

async fn handle_queue(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    match bot.player.queue_view(guild_id).await {
        Ok(view) => {
            if view.current.is_none() && view.upcoming.is_empty() {
                return respond_text(ctx, &command, "📭 La cola está vacía, ¡agregá música!")
                    .await;
            }
            let guild_name = ctx
                .cache
                .guild(guild_id)
                .map(|guild| guild.name.clone())
                .unwrap_or_else(|| "este servidor".to_string());
            respond_embed(ctx, &command, embeds::queue_embed(&view, &guild_name)).await
        }
        Err(e) => respond_text(ctx, &command, &error_reply(&e)).await,
    }
}

async fn handle_nowplaying(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    match bot.player.now_playing(guild_id).await {
        Ok(Some(np)) => respond_embed(ctx, &command, embeds::now_playing_embed(&np)).await,
        Ok(None) => respond_text(ctx, &command, &error_reply(&MusicError::NotPlaying)).await,
        Err(e) => respond_text(ctx, &command, &error_reply(&e)).await,
    }
}

async fn handle_shuffle(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    let reply = match bot.player.shuffle(guild_id).await {
        Ok(count) => format!("🔀 Cola mezclada ({count} tracks)"),
        Err(e) => error_reply(&e),
    };
    respond_text(ctx, &command, &reply).await
}

async fn handle_clear(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    let reply = match bot.player.clear(guild_id).await {
        Ok(removed) => format!("🗑️ Cola limpiada ({removed} tracks eliminados)"),
        Err(e) => error_reply(&e),
    };
    respond_text(ctx, &command, &reply).await
}

async fn handle_remove_duplicates(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    let reply = match bot.player.remove_duplicates(guild_id).await {
        Ok(0) => "✅ No había duplicados en la cola".to_string(),
        Ok(removed) => format!("🗑️ {removed} duplicados eliminados"),
        Err(e) => error_reply(&e),
    };
    respond_text(ctx, &command, &reply).await
}

async fn handle_loop(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    let mode = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "mode")
        .and_then(|opt| opt.value.as_str())
        .and_then(LoopMode::parse);

    let Some(mode) = mode else {
        return respond_text(ctx, &command, "❌ Modo de repetición inválido").await;
    };

    let reply = match bot.player.set_loop_mode(guild_id, mode).await {
        Ok(()) => format!("🔁 Repetición configurada en **{mode}**"),
        Err(e) => error_reply(&e),
    };
    respond_text(ctx, &command, &reply).await
}

async fn handle_disconnect(
    ctx: &Context,
    command: CommandInteraction,
    bot: &EncoreBot,
    guild_id: GuildId,
) -> Result<()> {
    let reply = match bot.player.disconnect(guild_id).await {
        Ok(()) => "👋 ¡Hasta la próxima!".to_string(),
        Err(e) => error_reply(&e),
    };
    respond_text(ctx, &command, &reply).await
}

// Utilidades

/// Canal de voz en el que está el usuario, según el cache del gateway.
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    ctx.cache
        .guild(guild_id)
        .and_then(|guild| guild.voice_states.get(&user_id).and_then(|vs| vs.channel_id))
}

/// Traduce un error del núcleo a una respuesta para el usuario.
fn error_reply(error: &MusicError) -> String {
    match error {
        MusicError::NotPlaying => "❌ Probá reproducir algo primero".to_string(),
        MusicError::AlreadyConnected => "❌ Ya hay una sesión activa en este servidor".to_string(),
        MusicError::VoiceChannelRequired => {
            "❌ Debes estar conectado a un canal de voz".to_string()
        }
        MusicError::Resolution(_) => {
            "❌ No pude resolver esa URL, revisá que el video exista".to_string()
        }
        MusicError::RendererUnavailable(_) => {
            "⚠️ El reproductor no responde, intentá de nuevo en unos segundos".to_string()
        }
        MusicError::QueueFull(max) => format!("❌ La cola está llena (máximo {max} canciones)"),
    }
}

async fn respond_text(ctx: &Context, command: &CommandInteraction, text: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(text),
            ),
        )
        .await?;
    Ok(())
}

async fn respond_embed(ctx: &Context, command: &CommandInteraction, embed: CreateEmbed) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await?;
    Ok(())
}
