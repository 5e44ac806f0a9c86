//! End-of-line resolution for written text.
//!
//! The terminator is chosen from the host platform once per process and
//! cached; every writer in the process uses the same value.

use std::sync::OnceLock;

/// Represents the end-of-line sequence appended after every written line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EolType {
    /// Line Feed (Unix/Linux/macOS) - \n
    Lf,
    /// Carriage Return + Line Feed (Windows) - \r\n
    Crlf,
}

impl EolType {
    /// The end-of-line convention of the platform this binary was built for.
    pub const fn platform() -> Self {
        if cfg!(windows) {
            EolType::Crlf
        } else {
            EolType::Lf
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EolType::Lf => "\n",
            EolType::Crlf => "\r\n",
        }
    }

    /// Length in characters, as counted against the chunk threshold.
    pub const fn char_len(self) -> usize {
        match self {
            EolType::Lf => 1,
            EolType::Crlf => 2,
        }
    }
}

static LINE_BREAK: OnceLock<EolType> = OnceLock::new();

/// The process-wide line terminator type, resolved on first access.
pub fn line_break_type() -> EolType {
    *LINE_BREAK.get_or_init(EolType::platform)
}

/// The process-wide line terminator string.
pub fn line_break() -> &'static str {
    line_break_type().as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_eol() {
        if cfg!(windows) {
            assert_eq!(EolType::platform(), EolType::Crlf);
        } else {
            assert_eq!(EolType::platform(), EolType::Lf);
        }
    }

    #[test]
    fn test_as_str_matches_char_len() {
        for eol in [EolType::Lf, EolType::Crlf] {
            assert_eq!(eol.as_str().chars().count(), eol.char_len());
        }
    }

    #[test]
    fn test_line_break_is_stable() {
        let first = line_break();
        let second = line_break();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first, EolType::platform().as_str());
    }
}
