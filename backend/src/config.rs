use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_MODEL_PATH: &str = "models/lung_cancer.onnx";
pub const DEFAULT_STATIC_DIR: &str = "./frontend";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name}={value} is not a valid {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub model_path: PathBuf,
    pub static_dir: PathBuf,
    pub threshold: f32,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source, falling back to defaults
    /// for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse::<u16, _>(&lookup, "PORT", "port number")?.unwrap_or(8080);
        let workers = match parse::<usize, _>(&lookup, "WORKERS", "worker count")? {
            Some(0) | None => num_cpus::get(),
            Some(n) => n,
        };
        let threshold = parse::<f32, _>(&lookup, "PREDICTION_THRESHOLD", "probability")?.unwrap_or(0.5);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                name: "PREDICTION_THRESHOLD",
                value: threshold.to_string(),
                expected: "probability",
            });
        }

        Ok(ServerConfig {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            workers,
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
            threshold,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T, F>(lookup: &F, name: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name,
                value: raw,
                expected,
            }),
    }
}
