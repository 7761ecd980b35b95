//! Raw status reports delivered by the module delivery service

use crate::ModuleId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Session status codes as numbered by the delivery service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Unknown,
    Pending,
    Downloading,
    Downloaded,
    Installing,
    Installed,
    Failed,
    Canceled,
    RequiresUserConfirmation,
    Canceling,
}

impl SessionStatus {
    /// Map a raw status code. Codes outside the known table yield `None`.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        let status = match code {
            0 => Self::Unknown,
            1 => Self::Pending,
            2 => Self::Downloading,
            3 => Self::Downloaded,
            4 => Self::Installing,
            5 => Self::Installed,
            6 => Self::Failed,
            7 => Self::Canceled,
            8 => Self::RequiresUserConfirmation,
            9 => Self::Canceling,
            _ => return None,
        };
        Some(status)
    }

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Pending => 1,
            Self::Downloading => 2,
            Self::Downloaded => 3,
            Self::Installing => 4,
            Self::Installed => 5,
            Self::Failed => 6,
            Self::Canceled => 7,
            Self::RequiresUserConfirmation => 8,
            Self::Canceling => 9,
        }
    }
}

/// One listener callback payload from the delivery service.
///
/// `status` stays a raw integer: the service may report codes this build does
/// not know about, and those must be ignored rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStateUpdate {
    pub session_id: i32,
    pub module_ids: BTreeSet<ModuleId>,
    pub status: i32,
    pub bytes_downloaded: i64,
    pub total_bytes_to_download: i64,
    pub error_code: i32,
}

impl SessionStateUpdate {
    /// Update for a single module with zeroed counters
    pub fn new(session_id: i32, module: impl Into<ModuleId>, status: SessionStatus) -> Self {
        Self {
            session_id,
            module_ids: BTreeSet::from([module.into()]),
            status: status.code(),
            bytes_downloaded: 0,
            total_bytes_to_download: 0,
            error_code: 0,
        }
    }

    #[must_use]
    pub fn with_bytes(mut self, downloaded: i64, total: i64) -> Self {
        self.bytes_downloaded = downloaded;
        self.total_bytes_to_download = total;
        self
    }

    #[must_use]
    pub fn with_error_code(mut self, code: i32) -> Self {
        self.error_code = code;
        self
    }

    #[must_use]
    pub fn with_raw_status(mut self, status: i32) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn concerns(&self, module: &ModuleId) -> bool {
        self.module_ids.contains(module)
    }

    #[must_use]
    pub fn session_status(&self) -> Option<SessionStatus> {
        SessionStatus::from_code(self.status)
    }

    /// Download progress as a percentage in `0..=100`.
    ///
    /// Zero when the total is unknown. Over-reported byte counts clamp to 100.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        if self.total_bytes_to_download <= 0 || self.bytes_downloaded <= 0 {
            return 0;
        }
        let percent = i128::from(self.bytes_downloaded) * 100
            / i128::from(self.total_bytes_to_download);
        u8::try_from(percent.min(100)).unwrap_or(100)
    }
}
