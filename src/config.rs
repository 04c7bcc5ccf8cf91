use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: f32,

    // Límites
    pub max_queue_size: usize,
    pub max_playlist_size: usize,

    // Nodo de audio: tiempo máximo de espera por llamada de control. Se
    // espera con el lock de sesión tomado, así que tiene que ser corto.
    pub node_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,

            // Límites
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            max_playlist_size: std::env::var("MAX_PLAYLIST_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            // Nodo de audio
            node_timeout: Duration::from_secs(
                std::env::var("NODE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
            ),
        };

        config.validate()?;

        Ok(config)
    }

    /// Chequeos de sanidad sobre los valores cargados.
    pub fn validate(&self) -> Result<()> {
        if self.default_volume < 0.0 || self.default_volume > 2.0 {
            anyhow::bail!(
                "El volumen debe estar entre 0.0 y 2.0, llegó: {}",
                self.default_volume
            );
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("El tamaño máximo de cola debe ser mayor a 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("El tamaño máximo de playlist debe ser mayor a 0");
        }

        if self.node_timeout.is_zero() || self.node_timeout > Duration::from_secs(30) {
            anyhow::bail!(
                "El timeout del nodo debe estar entre 1 y 30 segundos, llegó: {:?}",
                self.node_timeout
            );
        }

        Ok(())
    }
}

/// Valores por defecto, usados cuando las variables de entorno no están.
impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,
            default_volume: 0.5,
            max_queue_size: 1000,
            max_playlist_size: 100,
            node_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_volume() {
        let config = Config {
            default_volume: 3.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_queue_size() {
        let config = Config {
            max_queue_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_excessive_node_timeout() {
        let config = Config {
            node_timeout: Duration::from_secs(120),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
