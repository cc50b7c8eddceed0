use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::platform::Session;

pub const CONFIG_FILE_NAME: &str = "plate-ingest.json";
pub const ID_TOKEN_VAR: &str = "PAS_ID_TOKEN";
pub const ACCESS_TOKEN_VAR: &str = "PAS_ACCESS_TOKEN";
pub const TENANT_VAR: &str = "PAS_TENANT_ID";
pub const URL_VAR: &str = "PAS_URL";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub storage_region: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub session: Session,
    pub storage_region: String,
    pub timeout: Option<Duration>,
}

/// Source of secrets and overrides; the process environment outside tests.
pub trait Env {
    fn var(&self, name: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, IngestError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::default_path(),
        };
        let config = match config_path {
            Some(config_path) => {
                let content = fs::read_to_string(&config_path)
                    .map_err(|_| IngestError::ConfigRead(config_path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| IngestError::ConfigParse(err.to_string()))?
            }
            None => Config::default(),
        };
        Self::resolve_config(config, &ProcessEnv)
    }

    /// `plate-ingest.json` in the working directory, then the user config directory.
    fn default_path() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("", "", "plate-ingest")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config, env: &dyn Env) -> Result<ResolvedConfig, IngestError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let base_url = env
            .var(URL_VAR)
            .or(config.base_url)
            .ok_or(IngestError::MissingConfig)?;
        let tenant_id = env
            .var(TENANT_VAR)
            .or(config.tenant_id)
            .ok_or(IngestError::MissingCredential(TENANT_VAR))?;
        let id_token = env
            .var(ID_TOKEN_VAR)
            .ok_or(IngestError::MissingCredential(ID_TOKEN_VAR))?;
        let access_token = env
            .var(ACCESS_TOKEN_VAR)
            .ok_or(IngestError::MissingCredential(ACCESS_TOKEN_VAR))?;

        Ok(ResolvedConfig {
            schema_version,
            session: Session {
                base_url,
                id_token,
                access_token,
                tenant_id,
                role: config.role,
            },
            storage_region: config
                .storage_region
                .unwrap_or_else(default_storage_region),
            timeout: config.timeout_secs.map(Duration::from_secs),
        })
    }
}

pub fn default_storage_region() -> String {
    "us-west-2".to_string()
}
