//! Resolución de URLs a tracks reproducibles.

pub mod youtube;

use async_trait::async_trait;
use serenity::model::id::UserId;
use std::time::Duration;
use thiserror::Error;

use crate::audio::track::Track;

pub use youtube::YtDlpResolver;

/// Fallos de resolución. Son distintos de los fallos del nodo de audio: acá
/// la URL o el servicio de metadatos es el problema, no el renderizador.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("la URL no es válida: {0}")]
    InvalidUrl(String),
    #[error("la URL no produjo ningún track")]
    NoResults,
    #[error("el contenido no está disponible: {0}")]
    Unavailable(String),
    #[error("no se pudo ejecutar el resolvedor: {0}")]
    Tool(#[from] std::io::Error),
    #[error("respuesta del resolvedor ilegible: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Metadatos resueltos de un elemento, todavía sin atribución de usuario.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrack {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration: Duration,
}

impl ResolvedTrack {
    /// Lo convierte en un [`Track`] atribuido al usuario que lo pidió.
    pub fn into_track(self, requested_by: UserId) -> Track {
        Track::new(self.id, self.title, self.url, self.duration, requested_by)
    }
}

/// Servicio de resolución: una URL de video o de playlist se expande a una
/// secuencia ordenada de tracks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<Vec<ResolvedTrack>, ResolveError>;
}
