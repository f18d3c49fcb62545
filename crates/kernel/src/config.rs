//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use uuid::Uuid;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON data file with menus and grants (default: ./data/menudesk.json).
    pub data_path: PathBuf,

    /// TOML permission registry (default: ./data/permissions.toml).
    pub permissions_path: PathBuf,

    /// Tenant in scope. Selects the tenancy side for policy assembly.
    pub tenant_id: Option<Uuid>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let data_path = env::var("MENUDESK_DATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/menudesk.json"));

        let permissions_path = env::var("MENUDESK_PERMISSIONS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/permissions.toml"));

        let tenant_id = match env::var("MENUDESK_TENANT_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse()
                    .context("MENUDESK_TENANT_ID must be a valid UUID")?,
            ),
            _ => None,
        };

        Ok(Self {
            data_path,
            permissions_path,
            tenant_id,
        })
    }
}
