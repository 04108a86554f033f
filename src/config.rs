use anyhow::{Context, Result};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use crate::schema::SchemaVersion;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MODEL_PATH: &str = "model_assets/trained_model_lr.json";
pub const DEFAULT_SCALER_PATH: &str = "model_assets/scaled_data.json";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub schema: SchemaVersion,
    /// Emit per-request stage logs at info instead of debug.
    pub log_pred: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            scaler_path: PathBuf::from(DEFAULT_SCALER_PATH),
            schema: SchemaVersion::default(),
            log_pred: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults,
    /// set-but-invalid keys are errors.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = get("BIND_HOST") {
            cfg.host = v
                .trim()
                .parse()
                .with_context(|| format!("BIND_HOST is not an IP address: {:?}", v))?;
        }
        if let Some(v) = get("PORT") {
            cfg.port = v
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {:?}", v))?;
        }
        if let Some(v) = get("MODEL_PATH") {
            cfg.model_path = PathBuf::from(v);
        }
        if let Some(v) = get("SCALER_PATH") {
            cfg.scaler_path = PathBuf::from(v);
        }
        if let Some(v) = get("FEATURE_SCHEMA") {
            cfg.schema = v.parse().context("FEATURE_SCHEMA")?;
        }
        cfg.log_pred = get("LOG_PRED").as_deref() == Some("1");

        Ok(cfg)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
