//! Exit codes for vigilctl
//!
//! Codes follow sysexits.h where one fits.

use vigil_common::VigilError;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors (I/O, sink failures, bad snapshot)
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when the pipeline broke its own contract (EX_SOFTWARE)
pub const EXIT_CONTRACT_VIOLATION: i32 = 70;

/// Exit code for unreadable or invalid configuration (EX_CONFIG)
pub const EXIT_CONFIG_ERROR: i32 = 78;

/// Map an application error onto an exit code
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<VigilError>() {
        Some(e) if e.is_contract_violation() => EXIT_CONTRACT_VIOLATION,
        Some(VigilError::InvalidConfig(_)) | Some(VigilError::Toml(_)) => EXIT_CONFIG_ERROR,
        _ => EXIT_GENERAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_common::MetricKind;

    #[test]
    fn test_exit_codes() {
        let err = anyhow::Error::new(VigilError::unsupported(&MetricKind::GpuUsage, "bad"));
        assert_eq!(exit_code_for(&err), EXIT_CONTRACT_VIOLATION);

        let err = anyhow::Error::new(VigilError::InconsistentReportState("x".to_string()));
        assert_eq!(exit_code_for(&err), EXIT_CONTRACT_VIOLATION);

        let err = anyhow::Error::new(VigilError::InvalidConfig("weights".to_string()))
            .context("loading /etc/vigil/config.toml");
        assert_eq!(exit_code_for(&err), EXIT_CONFIG_ERROR);

        let err = anyhow::anyhow!("sink failed");
        assert_eq!(exit_code_for(&err), EXIT_GENERAL_ERROR);
    }
}
