use std::{env, net::SocketAddr, path::PathBuf};

use crate::error::AppError;

/// 2025 business rate: 70 cents per mile. Used whenever the live IRS
/// lookup fails or the page wording changes.
pub const DEFAULT_IRS_BUSINESS_RATE: f64 = 0.70;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub ors_api_key: Option<String>,
    pub fallback_rate: f64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let ors_api_key = env::var("ORS_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let fallback_rate = match env::var("IRS_FALLBACK_RATE") {
            Ok(raw) => raw
                .parse()
                .map_err(|err| AppError::Config(format!("invalid IRS_FALLBACK_RATE: {err}")))?,
            Err(_) => DEFAULT_IRS_BUSINESS_RATE,
        };

        Ok(Self {
            listen_addr,
            data_dir,
            ors_api_key,
            fallback_rate,
        })
    }
}
