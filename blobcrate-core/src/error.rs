//! Error types for blobcrate

use std::fmt;
use thiserror::Error;

/// Which output buffer ran out of room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertices,
    Triangles,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferKind::Vertices => f.write_str("vertex"),
            BufferKind::Triangles => f.write_str("triangle"),
        }
    }
}

/// Main error type for blobcrate operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Lattice topology violated at cube {cube:?}, edge {edge}: {reason}")]
    Topology {
        cube: [usize; 3],
        edge: usize,
        reason: String,
    },

    #[error("{buffer} buffer exhausted at capacity {capacity}")]
    CapacityExceeded { buffer: BufferKind, capacity: usize },

    #[error("Invalid transform: {0}")]
    InvalidTransform(String),
}

/// Result type alias for blobcrate operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_names_buffer() {
        let err = Error::CapacityExceeded {
            buffer: BufferKind::Triangles,
            capacity: 12,
        };
        assert_eq!(err.to_string(), "triangle buffer exhausted at capacity 12");
    }
}
