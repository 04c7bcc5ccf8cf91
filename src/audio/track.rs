use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::{fmt, time::Duration};

/// Un elemento reproducible con sus metadatos.
///
/// La posición de reproducción no vive acá: se le pregunta al nodo de audio
/// en vivo cuando hace falta mostrarla.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Identificador estable del video. Es la clave de deduplicación y de
    /// derivación del thumbnail.
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration: Duration,
    pub requested_by: UserId,
    #[allow(dead_code)]
    pub requested_at: DateTime<Utc>,
}

impl Track {
    pub fn new(
        id: String,
        title: String,
        url: String,
        duration: Duration,
        requested_by: UserId,
    ) -> Self {
        Self {
            id,
            title,
            url,
            duration,
            requested_by,
            requested_at: Utc::now(),
        }
    }

    /// Thumbnail derivado del identificador del video.
    pub fn thumbnail_url(&self) -> String {
        format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", self.id)
    }
}

/// Política aplicada cuando un track termina de forma natural.
///
/// Un skip explícito la anula siempre: los modos de loop solo aplican a
/// finales naturales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    Track,
    Queue,
}

impl LoopMode {
    /// Interpreta el valor de la opción del comando slash.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(Self::Off),
            "track" => Some(Self::Track),
            "queue" => Some(Self::Queue),
            _ => None,
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::Track => write!(f, "Track"),
            Self::Queue => write!(f, "Queue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_mode_parse() {
        assert_eq!(LoopMode::parse("off"), Some(LoopMode::Off));
        assert_eq!(LoopMode::parse("track"), Some(LoopMode::Track));
        assert_eq!(LoopMode::parse("queue"), Some(LoopMode::Queue));
        assert_eq!(LoopMode::parse("always"), None);
    }

    #[test]
    fn test_thumbnail_derived_from_id() {
        let track = Track::new(
            "dQw4w9WgXcQ".into(),
            "Test".into(),
            "https://youtu.be/dQw4w9WgXcQ".into(),
            Duration::from_secs(212),
            UserId::new(1),
        );
        assert_eq!(
            track.thumbnail_url(),
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
    }
}
