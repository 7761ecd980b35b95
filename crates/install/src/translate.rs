//! Mapping from delivery service status reports to install states

use crikstats_types::{InstallState, SessionStateUpdate, SessionStatus};

/// Translate one status report.
///
/// Returns `None` for statuses that have no install state (UNKNOWN,
/// DOWNLOADED, CANCELING) and for codes outside the known table.
pub(crate) fn translate(update: &SessionStateUpdate) -> Option<InstallState> {
    let state = match update.session_status()? {
        SessionStatus::Pending => InstallState::Pending,
        SessionStatus::Downloading => InstallState::Downloading {
            progress: update.progress_percent(),
        },
        SessionStatus::Installing => InstallState::Installing,
        SessionStatus::Installed => InstallState::Installed,
        SessionStatus::Failed => InstallState::provider_failure(update.error_code),
        SessionStatus::Canceled => InstallState::Canceled,
        SessionStatus::RequiresUserConfirmation => InstallState::RequiresConfirmation {
            session_id: update.session_id,
        },
        SessionStatus::Unknown | SessionStatus::Downloaded | SessionStatus::Canceling => {
            return None
        }
    };
    Some(state)
}
