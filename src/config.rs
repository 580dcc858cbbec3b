// ABOUTME: Runtime configuration loaded from the environment (and an optional .env file)
// ABOUTME: Covers database location, bind address, media directory and cookie security

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite:petstagram.db?mode=rwc";
const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEFAULT_MEDIA_DIR: &str = "media";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind: SocketAddr,
    pub media_dir: PathBuf,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();

        let database_url =
            std::env::var("PETSTAGRAM_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let bind = std::env::var("PETSTAGRAM_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let bind = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("PETSTAGRAM_BIND is not a socket address: {}", bind))?;

        let media_dir = std::env::var("PETSTAGRAM_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MEDIA_DIR));

        let cookie_secure = match std::env::var("PETSTAGRAM_COOKIE_SECURE") {
            Ok(value) => parse_flag(&value)
                .with_context(|| format!("PETSTAGRAM_COOKIE_SECURE must be a boolean, got {}", value))?,
            Err(_) => false,
        };

        Ok(Self {
            database_url,
            bind,
            media_dir,
            cookie_secure,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
