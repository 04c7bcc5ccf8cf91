use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    error::MusicError,
    sources::{ResolveError, TrackResolver},
};

use super::{
    node::{AudioNode, FinishReason, NodeError, NodeEvent},
    session::{GuildSession, SessionRegistry},
    track::{LoopMode, Track},
};

/// Resultado de un play, para que la capa de presentación lo describa.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    /// No había nada sonando: el primer track resuelto ya arrancó en el nodo.
    Started { track: Track, queued: usize },
    /// Ya había reproducción: todo lo resuelto quedó en cola.
    Queued { first: Track, queued: usize },
}

/// Vista de solo lectura de la cola de una guild.
#[derive(Debug, Clone)]
pub struct QueueView {
    pub current: Option<Track>,
    pub upcoming: Vec<Track>,
    pub loop_mode: LoopMode,
    pub is_paused: bool,
    pub total_duration: Duration,
}

/// Track actual más su posición en vivo según el nodo.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: Track,
    pub position: Option<Duration>,
    pub is_paused: bool,
}

/// Orquestador de reproducción: resuelve la sesión de la guild, muta cola y
/// estado bajo el lock de la sesión y habla con el nodo de audio sin soltar
/// ese lock, con timeout acotado para no colgar a las demás guilds.
pub struct PlayerManager {
    registry: SessionRegistry,
    node: Arc<dyn AudioNode>,
    resolver: Arc<dyn TrackResolver>,
    max_queue_size: usize,
    node_timeout: Duration,
}

impl PlayerManager {
    pub fn new(
        node: Arc<dyn AudioNode>,
        resolver: Arc<dyn TrackResolver>,
        config: &Config,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            node,
            resolver,
            max_queue_size: config.max_queue_size,
            node_timeout: config.node_timeout,
        }
    }

    /// Llamada al nodo con timeout. Quien la use debe mutar estado recién
    /// después del `Ok`: así un fallo deja todo como estaba.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, NodeError>>,
    ) -> Result<T, MusicError> {
        match tokio::time::timeout(self.node_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(MusicError::RendererUnavailable(e)),
            Err(_) => Err(MusicError::RendererUnavailable(NodeError::Timeout)),
        }
    }

    pub fn is_active(&self, guild_id: GuildId) -> bool {
        self.registry.contains(guild_id)
    }

    /// Crea la sesión de la guild y abre la conexión de voz.
    pub async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        let session = Arc::new(GuildSession::new(guild_id, channel_id, self.max_queue_size));

        // El lock se toma antes de publicar la sesión: cualquier comando que
        // llegue durante la conexión queda serializado detrás del join.
        let guard = session.lock().await;
        self.registry.insert(session.clone())?;

        if let Err(e) = self.bounded(self.node.connect(guild_id, channel_id)).await {
            self.registry.remove(guild_id);
            drop(guard);
            return Err(e);
        }

        info!(
            "🎧 Sesión creada para guild {} (canal {})",
            guild_id, session.channel_id
        );
        Ok(())
    }

    /// Resuelve la URL y arranca o encola los tracks resultantes.
    pub async fn play(
        &self,
        guild_id: GuildId,
        url: &str,
        requested_by: UserId,
    ) -> Result<PlayOutcome, MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;

        // La resolución no toca estado: corre fuera del lock de sesión.
        let resolved = self.resolver.resolve(url).await?;
        let mut tracks: Vec<Track> = resolved
            .into_iter()
            .map(|r| r.into_track(requested_by))
            .collect();
        if tracks.is_empty() {
            return Err(MusicError::Resolution(ResolveError::NoResults));
        }

        let mut inner = session.lock().await;

        if inner.playback.current.is_none() {
            let first = tracks.remove(0);
            self.bounded(self.node.play(guild_id, &first)).await?;

            inner.playback.current = Some(first.clone());
            inner.playback.is_paused = false;
            let queued = inner.queue.push_many(tracks);

            info!(
                "▶️ Arrancó {} en guild {} ({} en cola)",
                first.title, guild_id, queued
            );
            Ok(PlayOutcome::Started { track: first, queued })
        } else {
            let first = tracks[0].clone();
            let queued = inner.queue.push_many(tracks);
            if queued == 0 {
                return Err(MusicError::QueueFull(self.max_queue_size));
            }
            Ok(PlayOutcome::Queued { first, queued })
        }
    }

    /// Pausa el renderizador sin descartar nada.
    pub async fn stop(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;
        let mut inner = session.lock().await;

        if inner.playback.current.is_none() {
            return Err(MusicError::NotPlaying);
        }

        self.bounded(self.node.pause(guild_id)).await?;
        inner.playback.is_paused = true;
        Ok(())
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;
        let mut inner = session.lock().await;

        if inner.playback.current.is_none() {
            return Err(MusicError::NotPlaying);
        }

        self.bounded(self.node.resume(guild_id)).await?;
        inner.playback.is_paused = false;
        Ok(())
    }

    /// Descarta el track actual. El avance llega después como evento
    /// `Skipped` por el mismo camino serializado que los comandos, y ese
    /// motivo anula cualquier reinserción por loop.
    pub async fn skip(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;
        let inner = session.lock().await;

        if inner.playback.current.is_none() {
            return Err(MusicError::NotPlaying);
        }

        self.bounded(self.node.stop(guild_id)).await?;
        drop(inner);

        debug!("⏭️ Skip pedido en guild {}", guild_id);
        Ok(())
    }

    pub async fn shuffle(&self, guild_id: GuildId) -> Result<usize, MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;
        let mut inner = session.lock().await;
        inner.queue.shuffle();
        Ok(inner.queue.len())
    }

    pub async fn clear(&self, guild_id: GuildId) -> Result<usize, MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;
        let mut inner = session.lock().await;
        Ok(inner.queue.clear())
    }

    pub async fn remove_duplicates(&self, guild_id: GuildId) -> Result<usize, MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;
        let mut inner = session.lock().await;
        Ok(inner.queue.remove_duplicates())
    }

    pub async fn set_loop_mode(
        &self,
        guild_id: GuildId,
        mode: LoopMode,
    ) -> Result<(), MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;
        let mut inner = session.lock().await;
        inner.playback.loop_mode = mode;
        info!("🔁 Loop {} en guild {}", mode, guild_id);
        Ok(())
    }

    /// Track actual con su posición en vivo. `None` con sesión ociosa.
    pub async fn now_playing(&self, guild_id: GuildId) -> Result<Option<NowPlaying>, MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;
        let inner = session.lock().await;

        let Some(track) = inner.playback.current.clone() else {
            return Ok(None);
        };

        let position = self.bounded(self.node.position(guild_id)).await?;
        Ok(Some(NowPlaying {
            track,
            position,
            is_paused: inner.playback.is_paused,
        }))
    }

    pub async fn queue_view(&self, guild_id: GuildId) -> Result<QueueView, MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;
        let inner = session.lock().await;

        let current_duration = inner
            .playback
            .current
            .as_ref()
            .map(|track| track.duration)
            .unwrap_or_default();

        Ok(QueueView {
            current: inner.playback.current.clone(),
            upcoming: inner.queue.snapshot(),
            loop_mode: inner.playback.loop_mode,
            is_paused: inner.playback.is_paused,
            total_duration: inner.queue.total_duration() + current_duration,
        })
    }

    /// Cierra la conexión de voz y da de baja la sesión. Si el nodo falla,
    /// la sesión sigue viva y el comando puede reintentarse.
    pub async fn disconnect(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let session = self.registry.get(guild_id).ok_or(MusicError::NotPlaying)?;
        let mut inner = session.lock().await;

        self.bounded(self.node.disconnect(guild_id)).await?;

        inner.playback.current = None;
        inner.playback.is_paused = false;
        inner.queue.clear();
        drop(inner);

        self.registry.remove(guild_id);
        info!("👋 Sesión cerrada para guild {}", guild_id);
        Ok(())
    }

    /// Baja forzada: el gateway reporta que el bot ya no está en el canal.
    pub async fn forced_disconnect(&self, guild_id: GuildId) {
        if let Some(session) = self.registry.remove(guild_id) {
            let mut inner = session.lock().await;
            inner.playback.current = None;
            inner.playback.is_paused = false;
            inner.queue.clear();
            warn!("🔌 Sesión descartada tras desconexión forzada en guild {}", guild_id);
        }

        if let Err(e) = self.bounded(self.node.stop(guild_id)).await {
            debug!("Limpieza del nodo tras baja forzada falló: {}", e);
        }
    }

    /// Bucle consumidor del stream de eventos del nodo.
    pub async fn run_events(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<NodeEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        warn!("⚠️ El canal de eventos del nodo se cerró");
    }

    pub async fn handle_event(&self, event: NodeEvent) {
        match event {
            NodeEvent::TrackStarted { guild_id, track } => {
                debug!("▶️ Nodo reporta inicio de {} en guild {}", track.title, guild_id);
            }
            NodeEvent::TrackFinished {
                guild_id,
                track,
                reason,
            } => {
                self.advance(guild_id, track, reason).await;
            }
        }
    }

    /// Transición central del estado de reproducción cuando termina un track.
    async fn advance(&self, guild_id: GuildId, finished: Track, reason: FinishReason) {
        // Una sesión ya desmontada descarta sus eventos tardíos.
        let Some(session) = self.registry.get(guild_id) else {
            debug!("Evento tardío descartado para guild {}", guild_id);
            return;
        };
        let mut inner = session.lock().await;

        // Evento viejo de un track que ya no es el actual.
        if inner.playback.current.as_ref().map(|t| t.id.as_str())
            != Some(finished.id.as_str())
        {
            debug!("Fin de track obsoleto ignorado: {}", finished.title);
            return;
        }

        // Loop de track: solo ante un final natural. Un skip lo anula.
        if reason == FinishReason::Natural && inner.playback.loop_mode == LoopMode::Track {
            match self.bounded(self.node.play(guild_id, &finished)).await {
                Ok(()) => {
                    inner.playback.is_paused = false;
                    info!("🔂 Repitiendo {} en guild {}", finished.title, guild_id);
                }
                Err(e) => {
                    error!("❌ No se pudo repetir {}: {}", finished.title, e);
                    inner.playback.current = None;
                }
            }
            return;
        }

        // Loop de cola: el track terminado rota al final. Ni los saltados ni
        // los que fallaron vuelven a entrar.
        if reason == FinishReason::Natural && inner.playback.loop_mode == LoopMode::Queue {
            inner.queue.requeue(finished.clone());
        }

        match inner.queue.pop() {
            Some(next) => match self.bounded(self.node.play(guild_id, &next)).await {
                Ok(()) => {
                    info!("⏭️ Avanzando a {} en guild {}", next.title, guild_id);
                    inner.playback.current = Some(next);
                    inner.playback.is_paused = false;
                }
                Err(e) => {
                    error!("❌ No se pudo arrancar {}: {}", next.title, e);
                    inner.queue.restore_front(next);
                    inner.playback.current = None;
                }
            },
            None => {
                inner.playback.current = None;
                inner.playback.is_paused = false;
                info!("📭 Cola vacía en guild {}, renderizador en reposo", guild_id);

                if let Err(e) = self.bounded(self.node.stop(guild_id)).await {
                    warn!("⚠️ No se pudo poner el nodo en reposo: {}", e);
                }
            }
        }
    }
}
