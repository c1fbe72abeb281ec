// Configuration layer - logging, secrets, runtime settings
pub mod logging;
pub mod secrets;
pub mod settings;

pub use secrets::Secrets;
pub use settings::AppSettings;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Secret {name} is too short: minimum {min} characters")]
    SecretTooShort { name: String, min: usize },

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}
