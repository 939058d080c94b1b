pub mod app_config;
pub mod config;
pub mod directory;
pub mod model;
pub mod request;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use directory::{load_directory, slugify, DirectoryFile};
pub use model::{
    Attribute, BusinessRecord, BusinessStatus, Category, Location, ModerationStatus, RatingEvent,
    Region,
};
pub use request::{AttributeFilters, SearchRequest, DEFAULT_PAGE_SIZE, DEFAULT_RADIUS_KM};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read directory file {path}: {source}")]
    DirectoryFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse directory file: {0}")]
    DirectoryFileParse(#[from] serde_yaml::Error),

    #[error("directory validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid business status: {0}")]
    InvalidStatus(String),

    #[error("invalid moderation status: {0}")]
    InvalidModerationStatus(String),

    #[error("invalid search request: {0}")]
    InvalidRequest(String),
}
