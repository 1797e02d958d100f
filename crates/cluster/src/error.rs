use thiserror::Error;

use crate::ClusterId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    #[error("invalid cluster options: {0}")]
    InvalidOptions(String),
    #[error("item {index} has invalid coordinates")]
    InvalidPosition { index: usize },
    #[error("unknown cluster {0}")]
    UnknownCluster(ClusterId),
    #[error("malformed cluster id `{0}`")]
    MalformedId(String),
}
