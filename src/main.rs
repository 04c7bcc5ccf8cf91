use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;

use crate::audio::{node::SongbirdNode, player::PlayerManager};
use crate::bot::EncoreBot;
use crate::config::Config;
use crate::sources::YtDlpResolver;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("encore=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Encore v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    info!("🔧 Application ID: {}", config.application_id);

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    // El driver de voz es el nodo de audio externo: acá solo se arma el
    // puente de control y el canal de eventos que vuelve de él.
    let manager = Songbird::serenity();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let node = Arc::new(SongbirdNode::new(
        manager.clone(),
        reqwest::Client::new(),
        config.default_volume,
        events_tx,
    ));
    let resolver = Arc::new(YtDlpResolver::new(config.max_playlist_size));
    let player = Arc::new(PlayerManager::new(node, resolver, &config));

    // Los eventos del nodo se consumen por el mismo camino serializado por
    // guild que los comandos de usuario.
    tokio::spawn(player.clone().run_events(events_rx));

    let handler = EncoreBot::new(config.clone(), player);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(manager)
        .await?;

    // Shutdown limpio con Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Error al registrar Ctrl+C");
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        std::process::exit(0);
    });

    info!("🚀 Bot iniciado");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
