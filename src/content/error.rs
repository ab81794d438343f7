//! Content loading errors

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::{Partition, ShapeError};

/// What a load was aimed at, used in error messages and log fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A single record in a partition
    Record { partition: Partition, slug: String },
    /// The aggregate listing file
    Aggregate,
}

impl Target {
    pub fn record(partition: Partition, slug: &str) -> Self {
        Target::Record {
            partition,
            slug: slug.to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Record { partition, slug } => write!(f, "{}/{}", partition, slug),
            Target::Aggregate => f.write_str("aggregate"),
        }
    }
}

/// Failure to turn a file in the content store into a record
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{target}: not found")]
    NotFound { target: Target },

    #[error("{target}: malformed file: {source}")]
    Parse {
        target: Target,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{target}: invalid content: {source}")]
    Invalid {
        target: Target,
        #[source]
        source: ShapeError,
    },

    #[error("{target}: read failed: {source}")]
    Io {
        target: Target,
        #[source]
        source: std::io::Error,
    },

    #[error("{target}: read timed out after {after:?}")]
    Timeout { target: Target, after: Duration },
}

impl LoadError {
    /// The record does not exist; every other variant is a server fault
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }

    pub fn target(&self) -> &Target {
        match self {
            LoadError::NotFound { target }
            | LoadError::Parse { target, .. }
            | LoadError::Invalid { target, .. }
            | LoadError::Io { target, .. }
            | LoadError::Timeout { target, .. } => target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_display() {
        let target = Target::record(Partition::Pillar, "start-here");
        assert_eq!(target.to_string(), "pillar/start-here");
        assert_eq!(Target::Aggregate.to_string(), "aggregate");
    }

    #[test]
    fn test_only_not_found_is_not_found() {
        let missing = LoadError::NotFound {
            target: Target::Aggregate,
        };
        assert!(missing.is_not_found());

        let timeout = LoadError::Timeout {
            target: Target::Aggregate,
            after: Duration::from_millis(10),
        };
        assert!(!timeout.is_not_found());
        assert_eq!(timeout.target(), &Target::Aggregate);
    }
}
