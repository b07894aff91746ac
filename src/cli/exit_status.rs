use std::process::ExitCode;

/// Exit status for the extractor, following common conventions for
/// compiler-style tools.
///
/// - `Success` (0): extraction completed without errors
/// - `Failure` (1): extraction completed but reported errors
/// - `Error` (2): the run failed outright (bad arguments, I/O, config)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// Extraction completed without errors.
    Success,
    /// Extraction completed but reported errors.
    Failure,
    /// The run failed due to an internal error (I/O, config, usage).
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::Failure => ExitCode::from(1),
            ExitStatus::Error => ExitCode::from(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_values() {
        // ExitCode has no PartialEq; compare through Debug.
        let rendered = |status: ExitStatus| format!("{:?}", ExitCode::from(status));
        assert_eq!(rendered(ExitStatus::Success), format!("{:?}", ExitCode::from(0u8)));
        assert_eq!(rendered(ExitStatus::Failure), format!("{:?}", ExitCode::from(1u8)));
        assert_eq!(rendered(ExitStatus::Error), format!("{:?}", ExitCode::from(2u8)));
    }
}
