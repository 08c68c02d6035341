//! # Tessera Platform
//!
//! Platform abstraction layer for the Tessera runtime.
//!
//! This crate provides cross-platform abstractions for:
//! - **FileSystem**: Platform cache directories and async, atomic file I/O
//! - **Timers**: Timestamps, rolling frame-time windows and traced scopes

pub mod filesystem;
pub mod timer;

pub use filesystem::{AsyncFileHandle, FileSystem};
pub use timer::{RollingTimer, ScopedTimer, Timestamp};

use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("File I/O error: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("Not a directory: {0}")]
    NotADirectory(String),
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Platform identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Android (arm64)
    Android,
    /// iOS (arm64)
    Ios,
    /// Windows (x64)
    Windows,
    /// Linux (x64)
    Linux,
    /// macOS
    MacOs,
    /// Unknown platform
    Unknown,
}

impl Platform {
    /// Get the current platform
    pub fn current() -> Self {
        #[cfg(target_os = "android")]
        return Platform::Android;

        #[cfg(target_os = "ios")]
        return Platform::Ios;

        #[cfg(target_os = "windows")]
        return Platform::Windows;

        #[cfg(target_os = "linux")]
        return Platform::Linux;

        #[cfg(target_os = "macos")]
        return Platform::MacOs;

        #[cfg(not(any(
            target_os = "android",
            target_os = "ios",
            target_os = "windows",
            target_os = "linux",
            target_os = "macos"
        )))]
        return Platform::Unknown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detection() {
        let platform = Platform::current();
        assert!(matches!(
            platform,
            Platform::Android
                | Platform::Ios
                | Platform::Windows
                | Platform::Linux
                | Platform::MacOs
                | Platform::Unknown
        ));
    }
}
