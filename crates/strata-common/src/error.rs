//! Error types for Strata.

use thiserror::Error;

/// Result type alias using StrataError.
pub type Result<T> = std::result::Result<T, StrataError>;

/// Errors that can occur in Strata operations.
#[derive(Debug, Error)]
pub enum StrataError {
    // Cache / block store errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("block {block} out of range (image has {limit} blocks)")]
    BlockOutOfRange { block: u64, limit: u64 },

    #[error("buffer length {actual} does not match block size {expected}")]
    BlockSizeMismatch { expected: usize, actual: usize },

    // Index operation errors
    #[error("key not found")]
    NotFound,

    #[error("key already present")]
    Conflict,

    #[error("free list exhausted")]
    NoSpace,

    // Node codec errors
    #[error("slot index {index} out of range (capacity {capacity})")]
    SizeError { index: usize, capacity: usize },

    #[error("{field} is {actual} bytes, declared width is {expected}")]
    WidthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{accessor} is not valid on a {kind} node")]
    NodeTypeError {
        accessor: &'static str,
        kind: &'static str,
    },

    #[error("operation not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("structural invariant violated: {0}")]
    Insane(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: StrataError = io_err.into();
        assert!(matches!(err, StrataError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_block_out_of_range_display() {
        let err = StrataError::BlockOutOfRange { block: 99, limit: 64 };
        assert_eq!(err.to_string(), "block 99 out of range (image has 64 blocks)");
    }

    #[test]
    fn test_block_size_mismatch_display() {
        let err = StrataError::BlockSizeMismatch {
            expected: 256,
            actual: 512,
        };
        assert_eq!(
            err.to_string(),
            "buffer length 512 does not match block size 256"
        );
    }

    #[test]
    fn test_operation_errors_display() {
        assert_eq!(StrataError::NotFound.to_string(), "key not found");
        assert_eq!(StrataError::Conflict.to_string(), "key already present");
        assert_eq!(StrataError::NoSpace.to_string(), "free list exhausted");
    }

    #[test]
    fn test_size_error_display() {
        let err = StrataError::SizeError {
            index: 12,
            capacity: 12,
        };
        assert_eq!(err.to_string(), "slot index 12 out of range (capacity 12)");
    }

    #[test]
    fn test_width_mismatch_display() {
        let err = StrataError::WidthMismatch {
            field: "key",
            expected: 8,
            actual: 5,
        };
        assert_eq!(err.to_string(), "key is 5 bytes, declared width is 8");
    }

    #[test]
    fn test_node_type_error_display() {
        let err = StrataError::NodeTypeError {
            accessor: "value",
            kind: "interior",
        };
        assert_eq!(err.to_string(), "value is not valid on a interior node");
    }

    #[test]
    fn test_unimplemented_display() {
        let err = StrataError::Unimplemented("delete");
        assert_eq!(err.to_string(), "operation not implemented: delete");
    }

    #[test]
    fn test_insane_display() {
        let err = StrataError::Insane("leaf key count mismatch".to_string());
        assert_eq!(
            err.to_string(),
            "structural invariant violated: leaf key count mismatch"
        );
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(StrataError::NotFound)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StrataError>();
    }
}
