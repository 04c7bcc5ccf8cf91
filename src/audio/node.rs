use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::YoutubeDl, tracks::TrackHandle, Event, EventContext,
    EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::track::Track;

/// Fallos al hablar con el nodo de audio.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("no hay conexión de voz para la guild {0}")]
    NotConnected(GuildId),
    #[error("fallo de conexión de voz: {0}")]
    Connection(String),
    #[error("fallo de control de reproducción: {0}")]
    Control(String),
    #[error("el nodo no respondió dentro del tiempo límite")]
    Timeout,
}

/// Motivo con el que el nodo reporta el fin de un track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// El track llegó a su fin por sí solo.
    Natural,
    /// Un stop explícito (skip, disconnect) lo interrumpió.
    Skipped,
    /// El driver reportó un error de reproducción.
    Errored,
}

/// Evento entrante desde el nodo de audio. Se consume por el mismo camino
/// serializado por guild que los comandos de usuario.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    TrackStarted {
        guild_id: GuildId,
        track: Track,
    },
    TrackFinished {
        guild_id: GuildId,
        track: Track,
        reason: FinishReason,
    },
}

/// Contrato con el nodo de audio externo: conexión de voz, control de
/// reproducción y posición en vivo. Los eventos del nodo llegan por el canal
/// entregado al construir la implementación.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioNode: Send + Sync {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), NodeError>;

    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<(), NodeError>;

    async fn pause(&self, guild_id: GuildId) -> Result<(), NodeError>;

    async fn resume(&self, guild_id: GuildId) -> Result<(), NodeError>;

    /// Corta el track actual. Idempotente: sin track activo es un no-op.
    async fn stop(&self, guild_id: GuildId) -> Result<(), NodeError>;

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), NodeError>;

    /// Posición en vivo del track actual según el renderizador, que es la
    /// fuente de verdad — acá no corre ningún reloj propio.
    async fn position(&self, guild_id: GuildId) -> Result<Option<Duration>, NodeError>;
}

/// Track activo en el driver junto con la bandera de corte explícito.
struct ActiveTrack {
    handle: TrackHandle,
    stopped: Arc<AtomicBool>,
}

/// Implementación del nodo sobre songbird: el driver de voz hace la
/// decodificación y el streaming, acá solo viven el control y el reenvío de
/// eventos.
pub struct SongbirdNode {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    volume: f32,
    active: DashMap<GuildId, ActiveTrack>,
    events: mpsc::UnboundedSender<NodeEvent>,
}

impl SongbirdNode {
    pub fn new(
        manager: Arc<Songbird>,
        http: reqwest::Client,
        volume: f32,
        events: mpsc::UnboundedSender<NodeEvent>,
    ) -> Self {
        Self {
            manager,
            http,
            volume,
            active: DashMap::new(),
            events,
        }
    }

    /// Retira el handle activo marcándolo como corte explícito, para que su
    /// evento de fin no se reporte como final natural.
    fn discard_active(&self, guild_id: GuildId) {
        if let Some((_, active)) = self.active.remove(&guild_id) {
            active.stopped.store(true, Ordering::SeqCst);
            let _ = active.handle.stop();
        }
    }
}

#[async_trait]
impl AudioNode for SongbirdNode {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), NodeError> {
        self.manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| NodeError::Connection(e.to_string()))?;

        info!("🔊 Conectado al canal {} en guild {}", channel_id, guild_id);
        Ok(())
    }

    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<(), NodeError> {
        let call = self
            .manager
            .get(guild_id)
            .ok_or(NodeError::NotConnected(guild_id))?;

        // Un handle anterior no debe disparar avance al ser reemplazado.
        self.discard_active(guild_id);

        let source = YoutubeDl::new(self.http.clone(), track.url.clone());
        let handle = {
            let mut call = call.lock().await;
            call.play_input(source.into())
        };
        let _ = handle.set_volume(self.volume);

        let stopped = Arc::new(AtomicBool::new(false));
        let reported = Arc::new(AtomicBool::new(false));

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndForwarder {
                    guild_id,
                    track: track.clone(),
                    stopped: stopped.clone(),
                    reported: reported.clone(),
                    events: self.events.clone(),
                },
            )
            .map_err(|e| NodeError::Control(e.to_string()))?;

        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                TrackErrorForwarder {
                    guild_id,
                    track: track.clone(),
                    reported,
                    events: self.events.clone(),
                },
            )
            .map_err(|e| NodeError::Control(e.to_string()))?;

        self.active.insert(guild_id, ActiveTrack { handle, stopped });

        let _ = self.events.send(NodeEvent::TrackStarted {
            guild_id,
            track: track.clone(),
        });

        info!("🎵 Reproduciendo {} en guild {}", track.title, guild_id);
        Ok(())
    }

    async fn pause(&self, guild_id: GuildId) -> Result<(), NodeError> {
        let active = self
            .active
            .get(&guild_id)
            .ok_or(NodeError::NotConnected(guild_id))?;
        active
            .handle
            .pause()
            .map_err(|e| NodeError::Control(e.to_string()))
    }

    async fn resume(&self, guild_id: GuildId) -> Result<(), NodeError> {
        let active = self
            .active
            .get(&guild_id)
            .ok_or(NodeError::NotConnected(guild_id))?;
        active
            .handle
            .play()
            .map_err(|e| NodeError::Control(e.to_string()))
    }

    async fn stop(&self, guild_id: GuildId) -> Result<(), NodeError> {
        self.discard_active(guild_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), NodeError> {
        self.discard_active(guild_id);

        self.manager
            .remove(guild_id)
            .await
            .map_err(|e| NodeError::Connection(e.to_string()))?;

        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok(())
    }

    async fn position(&self, guild_id: GuildId) -> Result<Option<Duration>, NodeError> {
        let Some(active) = self.active.get(&guild_id) else {
            return Ok(None);
        };

        let info = active
            .handle
            .get_info()
            .await
            .map_err(|e| NodeError::Control(e.to_string()))?;

        Ok(Some(info.position))
    }
}

/// Reenvía el fin de un track como evento del nodo, una sola vez por track.
struct TrackEndForwarder {
    guild_id: GuildId,
    track: Track,
    stopped: Arc<AtomicBool>,
    reported: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<NodeEvent>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndForwarder {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        if self.reported.swap(true, Ordering::SeqCst) {
            return None;
        }

        let reason = if self.stopped.load(Ordering::SeqCst) {
            FinishReason::Skipped
        } else {
            FinishReason::Natural
        };

        debug!(
            "🏁 Track terminado en guild {}: {} ({:?})",
            self.guild_id, self.track.title, reason
        );

        let _ = self.events.send(NodeEvent::TrackFinished {
            guild_id: self.guild_id,
            track: self.track.clone(),
            reason,
        });

        None
    }
}

/// El driver puede emitir Error y End para el mismo track; `reported` se
/// comparte entre ambos forwarders para que gane el primero.
struct TrackErrorForwarder {
    guild_id: GuildId,
    track: Track,
    reported: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<NodeEvent>,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorForwarder {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        if self.reported.swap(true, Ordering::SeqCst) {
            return None;
        }

        error!(
            "❌ Error de reproducción en guild {}: {}",
            self.guild_id, self.track.title
        );

        let _ = self.events.send(NodeEvent::TrackFinished {
            guild_id: self.guild_id,
            track: self.track.clone(),
            reason: FinishReason::Errored,
        });

        None
    }
}
