use std::process::ExitStatus;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Status reported when a command cannot be resolved on the search path.
pub const NOT_FOUND: ExitCode = 127;

/// Status reported when a resolved command could not be started.
pub const CANNOT_EXECUTE: ExitCode = 126;

/// Convert the status of a reaped child into a shell exit code.
///
/// Processes killed by a signal report `128 + signal`, as POSIX shells do.
pub fn exit_code_of(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn test_plain_exit_code_passes_through() {
        // wait(2) encodes a normal exit as `code << 8`
        assert_eq!(exit_code_of(ExitStatus::from_raw(3 << 8)), 3);
        assert_eq!(exit_code_of(ExitStatus::from_raw(0)), 0);
    }

    #[test]
    fn test_signal_maps_to_128_plus_signal() {
        // SIGPIPE (13) without core dump
        assert_eq!(exit_code_of(ExitStatus::from_raw(13)), 141);
    }
}
