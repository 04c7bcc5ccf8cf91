use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{ResolveError, ResolvedTrack, TrackResolver};

/// Resolvedor de metadatos sobre yt-dlp. Solo extrae metadatos: el streaming
/// del audio lo hace el nodo por su cuenta.
pub struct YtDlpResolver {
    max_playlist_size: usize,
}

/// Información extraída de yt-dlp (una línea JSON por elemento).
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: String,
    title: String,
    duration: Option<f64>,
    webpage_url: Option<String>,
    url: Option<String>,
}

impl YtDlpResolver {
    pub fn new(max_playlist_size: usize) -> Self {
        Self { max_playlist_size }
    }

    fn is_supported_url(url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };

        matches!(
            parsed.host_str(),
            Some(
                "www.youtube.com"
                    | "youtube.com"
                    | "music.youtube.com"
                    | "m.youtube.com"
                    | "youtu.be"
            )
        )
    }

    fn is_playlist_url(url: &str) -> bool {
        Url::parse(url)
            .map(|parsed| parsed.query_pairs().any(|(key, _)| key == "list"))
            .unwrap_or(false)
    }

    fn parse_entry(line: &str) -> Result<ResolvedTrack, ResolveError> {
        let entry: YtDlpEntry = serde_json::from_str(line)?;

        let url = entry
            .webpage_url
            .or(entry.url)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", entry.id));

        Ok(ResolvedTrack {
            duration: Duration::from_secs_f64(entry.duration.unwrap_or(0.0).max(0.0)),
            id: entry.id,
            title: entry.title,
            url,
        })
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, url: &str) -> Result<Vec<ResolvedTrack>, ResolveError> {
        if !Self::is_supported_url(url) {
            return Err(ResolveError::InvalidUrl(url.to_string()));
        }

        let playlist = Self::is_playlist_url(url);
        debug!("📊 Resolviendo {} (playlist: {})", url, playlist);

        let mut command = Command::new("yt-dlp");
        command.args(["--dump-json", "--skip-download", "--no-warnings"]);
        if playlist {
            // Para playlists alcanza la metadata plana; el orden de origen
            // se preserva.
            command.arg("--flat-playlist");
            command.arg(format!("--playlist-end={}", self.max_playlist_size));
        } else {
            command.arg("--no-playlist");
        }
        command.arg(url);

        let output = command.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::Unavailable(
                stderr.lines().last().unwrap_or("yt-dlp falló").to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut tracks = Vec::new();
        for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
            tracks.push(Self::parse_entry(line)?);
        }

        if tracks.is_empty() {
            return Err(ResolveError::NoResults);
        }

        info!("🔍 {} resuelto en {} track(s)", url, tracks.len());
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_supported_url_detection() {
        assert!(YtDlpResolver::is_supported_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(YtDlpResolver::is_supported_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(YtDlpResolver::is_supported_url(
            "https://music.youtube.com/watch?v=test"
        ));
        assert!(!YtDlpResolver::is_supported_url("https://example.com/video"));
        assert!(!YtDlpResolver::is_supported_url("no es una url"));
    }

    #[test]
    fn test_playlist_url_detection() {
        assert!(YtDlpResolver::is_playlist_url(
            "https://www.youtube.com/watch?v=abc&list=PLx123"
        ));
        assert!(YtDlpResolver::is_playlist_url(
            "https://www.youtube.com/playlist?list=PLx123"
        ));
        assert!(!YtDlpResolver::is_playlist_url(
            "https://www.youtube.com/watch?v=abc"
        ));
    }

    #[test]
    fn test_parse_entry_with_full_metadata() {
        let line = r#"{"id":"dQw4w9WgXcQ","title":"Never Gonna Give You Up","duration":212.0,"webpage_url":"https://www.youtube.com/watch?v=dQw4w9WgXcQ"}"#;
        let track = YtDlpResolver::parse_entry(line).unwrap();

        assert_eq!(track.id, "dQw4w9WgXcQ");
        assert_eq!(track.title, "Never Gonna Give You Up");
        assert_eq!(track.duration, Duration::from_secs(212));
        assert_eq!(track.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_parse_flat_playlist_entry_derives_url() {
        // --flat-playlist no trae webpage_url; la URL sale del id.
        let line = r#"{"id":"abc123def45","title":"Una canción","duration":null}"#;
        let track = YtDlpResolver::parse_entry(line).unwrap();

        assert_eq!(track.url, "https://www.youtube.com/watch?v=abc123def45");
        assert_eq!(track.duration, Duration::ZERO);
    }

    #[test]
    fn test_parse_entry_rejects_garbage() {
        assert!(matches!(
            YtDlpResolver::parse_entry("esto no es json"),
            Err(ResolveError::Malformed(_))
        ));
    }
}
