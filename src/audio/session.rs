use dashmap::{mapref::entry::Entry, DashMap};
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::MusicError;

use super::{
    queue::MusicQueue,
    track::{LoopMode, Track},
};

/// Estado de reproducción de una guild.
#[derive(Debug)]
pub struct PlaybackState {
    /// Track sonando ahora. `None` significa sesión ociosa, que es distinto
    /// de cola vacía.
    pub current: Option<Track>,
    pub loop_mode: LoopMode,
    pub is_paused: bool,
}

impl PlaybackState {
    fn new() -> Self {
        Self {
            current: None,
            loop_mode: LoopMode::Off,
            is_paused: false,
        }
    }
}

/// Estado interior de la sesión, protegido por el lock único de la sesión.
#[derive(Debug)]
pub struct SessionInner {
    pub queue: MusicQueue,
    pub playback: PlaybackState,
}

/// Sesión de reproducción de una guild: una cola, un estado de reproducción
/// y la conexión de voz asociada. Es la unidad de aislamiento y de locking —
/// ninguna operación mutante corre sin tomar su lock, y el lock se mantiene
/// durante la llamada al nodo de audio para que dos comandos concurrentes
/// sobre la misma guild nunca se intercalen.
#[derive(Debug)]
pub struct GuildSession {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    inner: Mutex<SessionInner>,
}

impl GuildSession {
    pub fn new(guild_id: GuildId, channel_id: ChannelId, max_queue_size: usize) -> Self {
        Self {
            guild_id,
            channel_id,
            inner: Mutex::new(SessionInner {
                queue: MusicQueue::new(max_queue_size),
                playback: PlaybackState::new(),
            }),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().await
    }
}

/// Mapa global guild → sesión, la única estructura compartida entre guilds.
///
/// Su lock interno cubre solo altas, bajas y búsquedas; nunca se mantiene
/// durante el procesamiento de un comando, así que guilds distintas jamás se
/// bloquean entre sí.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<GuildSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alta de sesión, usada solo por join. Falla si la guild ya tiene una.
    pub fn insert(&self, session: Arc<GuildSession>) -> Result<(), MusicError> {
        match self.sessions.entry(session.guild_id) {
            Entry::Occupied(_) => Err(MusicError::AlreadyConnected),
            Entry::Vacant(entry) => {
                debug!("🆕 Sesión registrada para guild {}", session.guild_id);
                entry.insert(session);
                Ok(())
            }
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildSession>> {
        self.sessions.get(&guild_id).map(|entry| entry.clone())
    }

    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<GuildSession>> {
        self.sessions.remove(&guild_id).map(|(_, session)| session)
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(guild: u64) -> Arc<GuildSession> {
        Arc::new(GuildSession::new(
            GuildId::new(guild),
            ChannelId::new(99),
            10,
        ))
    }

    #[test]
    fn test_insert_refuses_duplicate_guild() {
        let registry = SessionRegistry::new();
        assert!(registry.insert(session(1)).is_ok());
        assert!(matches!(
            registry.insert(session(1)),
            Err(MusicError::AlreadyConnected)
        ));
    }

    #[test]
    fn test_get_absent_guild_is_none() {
        let registry = SessionRegistry::new();
        registry.insert(session(1)).unwrap();
        assert!(registry.get(GuildId::new(2)).is_none());
    }

    #[test]
    fn test_remove_releases_the_slot() {
        let registry = SessionRegistry::new();
        registry.insert(session(1)).unwrap();
        assert!(registry.remove(GuildId::new(1)).is_some());
        assert!(!registry.contains(GuildId::new(1)));
        assert!(registry.insert(session(1)).is_ok());
    }

    #[tokio::test]
    async fn test_session_lock_serializes_mutations() {
        let session = session(1);
        let mut handles = Vec::new();

        for i in 0..8u64 {
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                let mut inner = session.lock().await;
                // Lectura-modificación-escritura bajo el lock: sin lost updates.
                let len = inner.queue.len();
                inner.queue.push_many(vec![Track::new(
                    format!("t{i}"),
                    format!("Track {i}"),
                    format!("https://youtu.be/t{i}"),
                    std::time::Duration::from_secs(60),
                    serenity::model::id::UserId::new(1),
                )]);
                assert_eq!(inner.queue.len(), len + 1);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(session.lock().await.queue.len(), 8);
    }
}
