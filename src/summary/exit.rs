//! Stable process exit codes

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitCode {
    /// Every platform published, now or by an earlier run
    Success,
    /// Configuration or usage error; nothing was attempted
    Config,
    /// At least one platform failed
    PlatformFailed,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::Config => 1,
            ExitCode::PlatformFailed => 3,
        }
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            1 => Some(ExitCode::Config),
            3 => Some(ExitCode::PlatformFailed),
            _ => None,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Config.as_i32(), 1);
        assert_eq!(ExitCode::PlatformFailed.as_i32(), 3);
        assert_eq!(ExitCode::from_i32(3), Some(ExitCode::PlatformFailed));
        assert_eq!(ExitCode::from_i32(2), None);
    }
}
