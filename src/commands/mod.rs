pub mod fields;
pub mod recommend;
pub mod results;
pub mod status;
pub mod submit;

use std::process::ExitCode;

/// Exit code for failures already reported to the user as prose.
pub(crate) fn handled_failure() -> ExitCode {
    ExitCode::from(2)
}
