use std::{fs, path::Path};

use serde::Deserialize;

use crate::{Result, transform::ConnectionStrategy};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// workflow server instance
    pub instance: InstanceConfig,
    /// transformation defaults
    pub transform: TransformConfig,
    /// http request timeout in milliseconds, defaults to 30000
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// base url of the workflow server, e.g. `https://n8n.example.com`
    pub url: Option<String>,
    /// api key sent as `X-N8N-API-KEY`
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub connection_strategy: ConnectionStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance: InstanceConfig::default(),
            transform: TransformConfig::default(),
            request_timeout: 30_000,
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        Ok(config)
    }
}
