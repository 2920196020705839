use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Failed to read endpoint file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid endpoint YAML in {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to walk endpoint directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Endpoint #{index} ('{host}') in {origin}: {reason}")]
    InvalidEndpoint {
        origin: String,
        index: usize,
        host: String,
        reason: String,
    },

    #[error("No endpoints defined in {origin}")]
    Empty { origin: String },
}
