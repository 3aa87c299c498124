//! Application configuration management.
//!
//! This module handles loading and saving the console configuration: backend
//! URL, endpoint paths, inactivity window, session storage backend and the
//! last email used to sign in.
//!
//! Configuration is stored at `~/.config/backoffice/config.json`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::auth::store::{FileStore, KeyringStore, MemoryStore, SessionStore};
use crate::auth::watchdog::DEFAULT_INACTIVITY_WINDOW;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "backoffice";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Directory (inside the cache dir) holding the file-backed session
const SESSION_DIR: &str = "session";

/// Keychain service name for the keyring-backed session
const KEYRING_SERVICE: &str = "backoffice-console";

/// Backend used when nothing is configured (the local development API)
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Upper bound on the backend logout call so local cleanup is never held up
const DEFAULT_LOGOUT_TIMEOUT_SECS: u64 = 10;

/// Environment overrides
const ENV_BASE_URL: &str = "BACKOFFICE_BASE_URL";
const ENV_EMAIL: &str = "BACKOFFICE_EMAIL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Session lives only as long as the process
    Memory,
    /// Session files in the cache directory, shared by every console
    /// instance of the same OS user (owner-only permissions on unix)
    #[default]
    File,
    /// OS keychain
    Keyring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub logout: String,
    pub profile: String,
    pub profile_update: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/api/admin/login".to_string(),
            logout: "/api/admin/logout".to_string(),
            profile: "/api/admin/get_admin".to_string(),
            profile_update: "/api/admin/admin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub base_url: Option<String>,
    pub last_email: Option<String>,
    pub inactivity_minutes: Option<u64>,
    pub storage: StorageBackend,
    pub endpoints: Endpoints,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Apply `BACKOFFICE_BASE_URL` and `BACKOFFICE_EMAIL` from the environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(std::env::var(ENV_BASE_URL).ok(), std::env::var(ENV_EMAIL).ok());
    }

    fn apply_overrides(&mut self, base_url: Option<String>, email: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
            self.last_email = Some(email);
        }
    }

    pub fn session_settings(&self) -> Result<SessionSettings> {
        let raw = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(raw).with_context(|| format!("Invalid base URL: {}", raw))?;

        let mut settings = SessionSettings::new(base_url).with_endpoints(&self.endpoints);
        if let Some(minutes) = self.inactivity_minutes.filter(|m| *m > 0) {
            settings = settings.with_inactivity_window(Duration::from_secs(minutes * 60));
        }
        Ok(settings)
    }

    /// Build the configured session store
    pub fn open_store(&self) -> Result<Arc<dyn SessionStore>> {
        let store: Arc<dyn SessionStore> = match self.storage {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => Arc::new(FileStore::new(Self::cache_dir()?.join(SESSION_DIR))),
            StorageBackend::Keyring => Arc::new(KeyringStore::new(KEYRING_SERVICE)),
        };
        Ok(store)
    }
}

/// Everything the session manager needs to know about the backend.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub base_url: Url,
    pub login_path: String,
    pub logout_path: String,
    pub profile_path: String,
    pub profile_update_path: String,
    pub inactivity_window: Duration,
    pub logout_timeout: Duration,
}

impl SessionSettings {
    pub fn new(base_url: Url) -> Self {
        Self::from_parts(base_url, &Endpoints::default())
    }

    fn from_parts(base_url: Url, endpoints: &Endpoints) -> Self {
        Self {
            base_url,
            login_path: endpoints.login.clone(),
            logout_path: endpoints.logout.clone(),
            profile_path: endpoints.profile.clone(),
            profile_update_path: endpoints.profile_update.clone(),
            inactivity_window: DEFAULT_INACTIVITY_WINDOW,
            logout_timeout: Duration::from_secs(DEFAULT_LOGOUT_TIMEOUT_SECS),
        }
    }

    pub fn with_endpoints(self, endpoints: &Endpoints) -> Self {
        Self {
            inactivity_window: self.inactivity_window,
            logout_timeout: self.logout_timeout,
            ..Self::from_parts(self.base_url, endpoints)
        }
    }

    pub fn with_inactivity_window(mut self, window: Duration) -> Self {
        self.inactivity_window = window;
        self
    }

    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }
}
