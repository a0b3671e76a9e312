//! Error types for shardcache.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write
/// `Result<T>`, like `std::io::Result`.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors in shardcache.
///
/// Device I/O is the only fallible surface; everything else the cache can
/// get wrong is a programming error and panics instead of returning here.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying block device.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: Error = io_err.into();
        assert!(format!("{}", err).contains("device I/O error"));
    }
}
