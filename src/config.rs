//! Process configuration: command-line flags and the JSON config file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::{
    DEFAULT_MAX_TOKENS, NistP384,
    common::{
        errors::{ConfigError, StartupError},
        keys::{KeyMaterial, load_commitment_file, load_key_file},
    },
};

/// Default listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
/// Default token service port.
pub const DEFAULT_LISTEN_PORT: u16 = 2416;
/// Default metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 2417;

/// Command-line flags of the `btd` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "btd")]
#[command(about = "Blind token issuance and redemption server", long_about = None)]
pub struct Args {
    /// Local config file for development (overrides all other options)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value = DEFAULT_BIND_ADDRESS)]
    pub addr: String,

    /// Path to the secret key file
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Path to the commitment file
    #[arg(long)]
    pub comm: Option<PathBuf>,

    /// Port to listen on
    #[arg(short = 'p', long, default_value_t = DEFAULT_LISTEN_PORT)]
    pub port: u16,

    /// Metrics port
    #[arg(short = 'm', long, default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Maximum number of tokens issued per request
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub maxtokens: usize,

    /// Maximum log level
    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to listen on
    pub bind_address: String,
    /// Token service port
    pub listen_port: u16,
    /// Metrics port, `0` disables the metrics endpoint
    pub metrics_port: u16,
    /// Maximum number of tokens per issuance batch
    pub max_tokens: usize,
    /// Path to the PEM key file
    pub key_file_path: PathBuf,
    /// Path to the JSON commitment file
    pub comm_file_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
            max_tokens: DEFAULT_MAX_TOKENS,
            key_file_path: PathBuf::new(),
            comm_file_path: PathBuf::new(),
        }
    }
}

impl Config {
    /// Builds the configuration from the command line.
    ///
    /// If a config file is given it alone determines the configuration,
    /// starting from the defaults. The result is validated.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be loaded or the result is
    /// invalid.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self {
                bind_address: args.addr.clone(),
                listen_port: args.port,
                metrics_port: args.metrics_port,
                max_tokens: args.maxtokens,
                key_file_path: args.key.clone().unwrap_or_default(),
                comm_file_path: args.comm.clone().unwrap_or_default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Checks that the configuration can be served.
    ///
    /// # Errors
    /// Returns an error if a file path is empty or the batch limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_file_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingKeyPath);
        }
        if self.comm_file_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingCommitmentPath);
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens);
        }
        Ok(())
    }

    /// Returns the `host:port` the token service listens on.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.listen_port)
    }

    /// Returns the `host:port` of the metrics endpoint.
    #[must_use]
    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.metrics_port)
    }

    /// Loads the key and commitment files and checks them against each other.
    ///
    /// # Errors
    /// Returns an error if a file cannot be loaded or the commitment does not
    /// match the primary key.
    pub fn load_key_material(&self) -> Result<Arc<KeyMaterial<NistP384>>, StartupError> {
        let keys = load_key_file(&self.key_file_path)?;
        let commitment = load_commitment_file(&self.comm_file_path)?;
        Ok(Arc::new(KeyMaterial::new(keys, commitment)?))
    }
}
