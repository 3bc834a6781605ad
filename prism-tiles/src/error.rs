use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Query build error: {0}")]
    QueryBuild(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Response shape error: {0}")]
    ResponseShape(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The tile-generation stage an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Config,
    QueryBuild,
    Backend,
    ResponseShape,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::QueryBuild => "query_build",
            Stage::Backend => "backend",
            Stage::ResponseShape => "response_shape",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TileError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Config,
            Self::QueryBuild(_) => Stage::QueryBuild,
            Self::Backend(_) | Self::Http(_) => Stage::Backend,
            Self::ResponseShape(_) | Self::Json(_) => Stage::ResponseShape,
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Self::ResponseShape(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TileError>;
