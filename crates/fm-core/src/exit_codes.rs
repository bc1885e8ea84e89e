//! Exit codes for the fm-core CLI.
//!
//! Exit codes communicate the failure class without requiring output
//! parsing. They are stable.

use fm_common::Error;

/// Exit codes for fm-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Run completed
    Clean = 0,

    /// Configuration missing, unreadable, or invalid
    ConfigError = 10,

    /// Invalid range, domain, or count while generating or injecting
    GenerationError = 11,

    /// Missing or mistyped column in aggregation or charting
    AggregationError = 12,

    /// Export, render, or other I/O failure
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Map an error to its exit code by error-code band.
    pub fn from_error(err: &Error) -> Self {
        match err.code() {
            10..=19 => ExitCode::ConfigError,
            20..=29 => ExitCode::GenerationError,
            30..=39 => ExitCode::AggregationError,
            40..=49 | 60..=69 => ExitCode::IoError,
            _ => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}
