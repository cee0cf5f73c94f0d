use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn archive bytes into a [`MovieEntity`](crate::MovieEntity).
///
/// No partially built entity is ever returned alongside one of these.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Too short, or otherwise unusable before any decoding starts.
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Failed to inflate archive payload")]
    Decompression(#[source] std::io::Error),
    /// Zip extraction failed, an expected entry is missing, or the cache directory is unusable.
    #[error("Container extraction failed at {path:?}: {reason}")]
    ContainerExtraction {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    #[error("Schema decode failed: {0}")]
    SchemaDecode(String),
}

impl DecodeError {
    pub(crate) fn extraction(
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DecodeError::ContainerExtraction {
            path: path.into(),
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn missing_entry(path: impl Into<PathBuf>, entry: &str) -> Self {
        DecodeError::ContainerExtraction {
            path: path.into(),
            reason: format!("missing entry `{entry}`"),
            source: None,
        }
    }
}

impl From<prost::DecodeError> for DecodeError {
    fn from(err: prost::DecodeError) -> Self {
        DecodeError::SchemaDecode(err.to_string())
    }
}

/// Failure while building the layer relationships of a movie.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// A sprite references a matte layer that only appears after it in sprite order.
    #[error("Sprite {sprite} (`{image_key}`) uses matte `{matte_key}` which is defined later at sprite {matte_sprite}")]
    StructuralInconsistency {
        sprite: usize,
        image_key: String,
        matte_key: String,
        matte_sprite: usize,
    },
}
