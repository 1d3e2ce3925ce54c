use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Config Read Error: Path '{path}', Error: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Parse Error: Path '{path}', Error: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config Write Error: Path '{path}', Error: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON Serialization Error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Write Error: Path '{path}', Error: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory Creation Error: Path '{path}', Error: {source}")]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory Scan Error: Path '{path}', Error: {message}")]
    DirectoryScan { path: PathBuf, message: String },

    #[error("Invalid Project Root: '{0}' does not exist or is not a directory")]
    InvalidProjectRoot(PathBuf),

    #[error("Stack '{0}' already exists")]
    StackExists(String),

    #[error("Stack '{0}' does not exist")]
    StackNotFound(String),

    #[error("Project '{project}' already exists in stack '{stack}'")]
    ProjectExists { stack: String, project: String },

    #[error("Project '{project}' does not exist in stack '{stack}'")]
    ProjectNotFound { stack: String, project: String },

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        AppError::DirectoryScan {
            path,
            message: err.to_string(),
        }
    }
}
