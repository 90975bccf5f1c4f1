use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::products::CalculatorVariant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// How the request body is placed on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BodyEncoding {
    /// `application/x-www-form-urlencoded` with one `parameters` field.
    Form,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default)]
    pub local_mode: bool,
    #[serde(default)]
    pub apim_secret: String,
    #[serde(default = "default_body_encoding")]
    pub body_encoding: BodyEncoding,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub local_mode: Option<bool>,
    pub apim_secret: Option<String>,
    pub body_encoding: Option<BodyEncoding>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/p2x-calc/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.backend_url {
            self.backend.url = url;
        }
        if let Some(local_mode) = overrides.local_mode {
            self.backend.local_mode = local_mode;
        }
        if let Some(secret) = overrides.apim_secret {
            self.backend.apim_secret = secret;
        }
        if let Some(encoding) = overrides.body_encoding {
            self.backend.body_encoding = encoding;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.backend.timeout_secs = timeout;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    /// Copy safe to print or serve: the APIM secret is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.backend.apim_secret.is_empty() {
            copy.backend.apim_secret = "***".to_string();
        }
        copy
    }

    pub fn default_template() -> String {
        let template = r#"[backend]
url = "http://localhost:80/"
local_mode = false
apim_secret = ""
# "form" posts a single `parameters` field; "json" posts the raw object
body_encoding = "form"
timeout_secs = 300
connect_timeout_secs = 10

[server]
host = "127.0.0.1"
port = 8080
"#;
        template.to_string()
    }
}

impl BackendConfig {
    /// `POST` target for one calculator: the base URL plus the variant slug.
    pub fn endpoint(&self, variant: CalculatorVariant) -> String {
        let base = self.url.trim_end_matches('/');
        format!("{base}/{}", variant.as_slug())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            local_mode: false,
            apim_secret: String::new(),
            body_encoding: default_body_encoding(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:80/".to_string()
}

fn default_body_encoding() -> BodyEncoding {
    BodyEncoding::Form
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}
