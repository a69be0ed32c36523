use std::fmt;

use serde::{Serialize, Serializer};

/// Severity of a captured runtime error.
///
/// Each kind owns one bit of the classic error-level mask. Decoding is total:
/// anything that is not exactly one known bit becomes [`Severity::All`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Parse,
    Notice,
    CoreError,
    CoreWarning,
    CompileError,
    CompileWarning,
    UserError,
    UserWarning,
    UserNotice,
    Strict,
    RecoverableError,
    Deprecated,
    UserDeprecated,
    All,
}

impl Severity {
    pub fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Self::Error,
            2 => Self::Warning,
            4 => Self::Parse,
            8 => Self::Notice,
            16 => Self::CoreError,
            32 => Self::CoreWarning,
            64 => Self::CompileError,
            128 => Self::CompileWarning,
            256 => Self::UserError,
            512 => Self::UserWarning,
            1024 => Self::UserNotice,
            2048 => Self::Strict,
            4096 => Self::RecoverableError,
            8192 => Self::Deprecated,
            16384 => Self::UserDeprecated,
            _ => Self::All,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::Error => 1,
            Self::Warning => 2,
            Self::Parse => 4,
            Self::Notice => 8,
            Self::CoreError => 16,
            Self::CoreWarning => 32,
            Self::CompileError => 64,
            Self::CompileWarning => 128,
            Self::UserError => 256,
            Self::UserWarning => 512,
            Self::UserNotice => 1024,
            Self::Strict => 2048,
            Self::RecoverableError => 4096,
            Self::Deprecated => 8192,
            Self::UserDeprecated => 16384,
            Self::All => 32767,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Parse => "PARSE",
            Self::Notice => "NOTICE",
            Self::CoreError => "CORE_ERROR",
            Self::CoreWarning => "CORE_WARNING",
            Self::CompileError => "COMPILE_ERROR",
            Self::CompileWarning => "COMPILE_WARNING",
            Self::UserError => "USER_ERROR",
            Self::UserWarning => "USER_WARNING",
            Self::UserNotice => "USER_NOTICE",
            Self::Strict => "STRICT",
            Self::RecoverableError => "RECOVERABLE_ERROR",
            Self::Deprecated => "DEPRECATED",
            Self::UserDeprecated => "USER_DEPRECATED",
            Self::All => "ALL",
        }
    }

    /// Raised by application code rather than by the runtime itself.
    pub fn is_user(self) -> bool {
        matches!(
            self,
            Self::UserError | Self::UserWarning | Self::UserNotice | Self::UserDeprecated
        )
    }
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::UserError,
            log::Level::Warn => Self::UserWarning,
            log::Level::Info => Self::UserNotice,
            log::Level::Debug | log::Level::Trace => Self::UserDeprecated,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_bits_round_trip() {
        for bits in (0..15).map(|shift| 1u32 << shift) {
            let severity = Severity::from_bits(bits);
            assert_ne!(severity, Severity::All);
            assert_eq!(severity.bits(), bits);
        }
    }

    #[test]
    fn unknown_bits_fall_back_to_all() {
        assert_eq!(Severity::from_bits(0), Severity::All);
        assert_eq!(Severity::from_bits(3), Severity::All);
        assert_eq!(Severity::from_bits(32767), Severity::All);
        assert_eq!(Severity::from_bits(u32::MAX), Severity::All);
    }

    #[test]
    fn names() {
        assert_eq!(Severity::from_bits(2).to_string(), "WARNING");
        assert_eq!(Severity::from_bits(8192).name(), "DEPRECATED");
        assert_eq!(Severity::All.name(), "ALL");
    }

    #[test]
    fn log_levels_are_user_kinds() {
        assert_eq!(Severity::from(log::Level::Warn), Severity::UserWarning);
        assert!(Severity::from(log::Level::Error).is_user());
        assert!(!Severity::Warning.is_user());
    }
}
