//! Presentación: embeds y formato de texto para las respuestas del bot.

pub mod embeds;
