use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq)]
pub enum InsertResult {
    Added,
    AlreadyPresent,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RemoveResult {
    Removed,
    NotPresent,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Could not access state file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("State file {} is not valid JSON: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Could not encode state: {0}")]
    Encode(#[from] serde_json::Error),
}
