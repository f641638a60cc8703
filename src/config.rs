use std::{env, error::Error as StdError, net, path::PathBuf, time};

use serde::Deserialize;

/// Environment variable overriding the default `config.toml` location.
pub const PATH_ENV: &str = "TICKETING_CONFIG";

#[derive(Deserialize)]
pub struct Config {
    pub db: Db,
    pub http: Http,
    pub jwt: Jwt,
    pub qr: Qr,
    #[serde(default)]
    pub payment: Payment,
}

impl Config {
    pub async fn load() -> Result<Self, Box<dyn StdError>> {
        let path = env::var(PATH_ENV).unwrap_or_else(|_| "config.toml".into());
        let raw = tokio::fs::read_to_string(&path).await?;
        Ok(toml::from_str(&raw)?)
    }
}

#[derive(Deserialize)]
pub struct Db {
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    16
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize)]
pub struct Jwt {
    pub secret: String,
    #[serde(with = "humantime_serde")]
    pub expiration_time: time::Duration,
}

#[derive(Deserialize)]
pub struct Qr {
    pub dir: PathBuf,
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
}

fn default_public_prefix() -> String {
    "/qr".into()
}

#[derive(Default, Deserialize)]
pub struct Payment {
    /// Gateway server key used to verify callback signatures.
    pub server_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn parses_full_config() {
        let config = toml::from_str::<Config>(
            r#"
            [db]
            url = "postgres://ticketing@localhost/ticketing"

            [http.server]
            addr = "127.0.0.1:3000"

            [http.cors]
            allowed_origins = ["http://localhost:8080"]

            [jwt]
            secret = "secret"
            expiration_time = "1h"

            [qr]
            dir = "/var/lib/ticketing/qr"

            [payment]
            server_key = "SB-Mid-server-key"
            "#,
        )
        .unwrap();

        assert_eq!(config.db.pool_size, 16);
        assert_eq!(config.jwt.expiration_time.as_secs(), 3600);
        assert_eq!(config.qr.public_prefix, "/qr");
        assert_eq!(
            config.payment.server_key.as_deref(),
            Some("SB-Mid-server-key"),
        );
    }

    #[test]
    fn payment_section_is_optional() {
        let config = toml::from_str::<Config>(
            r#"
            [db]
            url = "postgres://localhost/ticketing"
            pool_size = 4

            [http.server]
            addr = "0.0.0.0:3000"

            [http.cors]
            allowed_origins = []

            [jwt]
            secret = "secret"
            expiration_time = "15m"

            [qr]
            dir = "qr"
            public_prefix = "/static/qr"
            "#,
        )
        .unwrap();

        assert_eq!(config.db.pool_size, 4);
        assert!(config.payment.server_key.is_none());
    }
}
