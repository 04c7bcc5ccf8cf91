use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::audio::{
    player::{NowPlaying, QueueView},
    track::{LoopMode, Track},
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const INFO_BLUE: Colour = Colour::from_rgb(3, 69, 252);
    #[allow(dead_code)]
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Encore";

/// Segmentos de la barra de progreso (0..=30 posiciones del marcador).
const PROGRESS_SEGMENTS: u32 = 30;

/// Crea el embed de "reproduciendo ahora" con la posición en vivo.
pub fn now_playing_embed(np: &NowPlaying) -> CreateEmbed {
    let mut description = String::new();

    if let Some(position) = np.position {
        description.push_str(&format!(
            "{} `{}` {}",
            format_duration(position),
            progress_bar(position, np.track.duration),
            format_duration(np.track.duration)
        ));
    } else {
        description.push_str(&format!(
            "Duración: `{}`",
            format_duration(np.track.duration)
        ));
    }

    if np.is_paused {
        description.push_str("\n⏸️ En pausa");
    }

    CreateEmbed::default()
        .title(format!("🎵 {}", np.track.title))
        .url(&np.track.url)
        .thumbnail(np.track.thumbnail_url())
        .color(colors::SUCCESS_GREEN)
        .description(description)
        .field(
            "👤 Solicitado por",
            format!("<@{}>", np.track.requested_by),
            true,
        )
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea el embed de la cola: lo que suena, lo que viene y los totales.
pub fn queue_embed(view: &QueueView, guild_name: &str) -> CreateEmbed {
    let mut description = String::new();

    description.push_str("__Sonando ahora:__\n");
    match &view.current {
        Some(track) => description.push_str(&format!("{}\n", track_line(track))),
        None => description.push_str("Nada por el momento\n"),
    }

    if !view.upcoming.is_empty() {
        description.push_str("\n__A continuación:__\n");
        for (index, track) in view.upcoming.iter().take(10).enumerate() {
            description.push_str(&format!("`{}.` {}\n", index + 1, track_line(track)));
        }
        if view.upcoming.len() > 10 {
            description.push_str(&format!("… y {} más\n", view.upcoming.len() - 10));
        }
    }

    let loop_badge = match view.loop_mode {
        LoopMode::Off => String::new(),
        mode => format!(" | 🔁[{mode}] activado"),
    };

    description.push_str(&format!(
        "\n**{} tracks en cola | {} de duración total{}**",
        view.upcoming.len(),
        format_duration(view.total_duration),
        loop_badge
    ));

    CreateEmbed::default()
        .title(format!("Cola de {guild_name}"))
        .color(colors::INFO_BLUE)
        .description(description)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Línea de un track en la cola: título enlazado y duración.
fn track_line(track: &Track) -> String {
    format!(
        "[{}]({}) | `{}`",
        track.title,
        track.url,
        format_duration(track.duration)
    )
}

/// Barra segmentada con el marcador en la posición actual.
pub fn progress_bar(position: Duration, duration: Duration) -> String {
    let marker = if duration.is_zero() {
        0
    } else {
        let ratio = position.as_secs_f64() / duration.as_secs_f64();
        (ratio * f64::from(PROGRESS_SEGMENTS)).round() as u32
    };
    let marker = marker.min(PROGRESS_SEGMENTS);

    (0..=PROGRESS_SEGMENTS)
        .map(|i| if i == marker { "🔘" } else { "▬" })
        .collect()
}

/// Formatea una duración como `M:SS`, o `H:MM:SS` a partir de la hora.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_secs(59)), "0:59");
        assert_eq!(format_duration(Duration::from_secs(212)), "3:32");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1:00:00");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
    }

    #[test]
    fn test_progress_bar_marker_positions() {
        let dur = Duration::from_secs(300);

        let start = progress_bar(Duration::ZERO, dur);
        assert!(start.starts_with("🔘"));

        let end = progress_bar(dur, dur);
        assert!(end.ends_with("🔘"));

        let middle = progress_bar(Duration::from_secs(150), dur);
        let segments: Vec<char> = middle.chars().collect();
        assert_eq!(segments.len(), 31);
        assert_eq!(segments[15], '🔘');
    }

    #[test]
    fn test_progress_bar_handles_zero_duration() {
        let bar = progress_bar(Duration::from_secs(10), Duration::ZERO);
        assert!(bar.starts_with("🔘"));
        assert_eq!(bar.chars().filter(|c| *c == '🔘').count(), 1);
    }

    #[test]
    fn test_progress_bar_clamps_overrun() {
        // Posición reportada más allá de la duración (metadata imprecisa).
        let bar = progress_bar(Duration::from_secs(400), Duration::from_secs(300));
        assert!(bar.ends_with("🔘"));
    }
}
