use thiserror::Error;

use crate::{audio::node::NodeError, sources::ResolveError};

/// Errores tipados del núcleo de reproducción.
///
/// El núcleo nunca formatea texto para el usuario: la capa de presentación
/// traduce cada variante a una respuesta. Ninguna variante es fatal — la
/// sesión y el registro quedan usables después de cualquier fallo.
#[derive(Debug, Error)]
pub enum MusicError {
    /// La operación requiere una sesión activa y la guild no tiene ninguna.
    #[error("no hay una sesión de reproducción activa en este servidor")]
    NotPlaying,

    /// Join sobre una guild que ya tiene sesión.
    #[error("ya existe una sesión activa en este servidor")]
    AlreadyConnected,

    /// El usuario que invoca no está en un canal de voz.
    #[error("el usuario no está conectado a un canal de voz")]
    VoiceChannelRequired,

    /// La URL no pudo resolverse a ningún track.
    #[error("no se pudo resolver la URL")]
    Resolution(#[from] ResolveError),

    /// El nodo de audio falló o no respondió dentro del timeout. El estado
    /// en memoria queda exactamente como antes de la llamada, así que
    /// reintentar es seguro.
    #[error("el nodo de audio no está disponible")]
    RendererUnavailable(#[from] NodeError),

    /// La cola alcanzó su capacidad máxima.
    #[error("la cola está llena (máximo {0} canciones)")]
    QueueFull(usize),
}
