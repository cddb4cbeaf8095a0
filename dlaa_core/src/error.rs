use crate::device::DeviceError;
use crate::sdk::SdkStatus;

/// Why the upscaling feature cannot run on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    NeedsUpdatedDriver,
    NotAvailable,
    FeatureInitFailed,
}

impl std::fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnsupportedReason::NeedsUpdatedDriver => "driver update required",
            UnsupportedReason::NotAvailable => "super sampling not available",
            UnsupportedReason::FeatureInitFailed => "feature init check failed",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("super sampling unsupported: {0}")]
    Unsupported(UnsupportedReason),
    #[error("feature creation rejected with status {0}")]
    FeatureCreation(SdkStatus),
    #[error("SDK call `{call}` failed with status {status}")]
    Sdk { call: &'static str, status: SdkStatus },
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl HookError {
    pub(crate) fn sdk(call: &'static str) -> impl FnOnce(SdkStatus) -> HookError {
        move |status| HookError::Sdk { call, status }
    }
}

pub type Result<T, E = HookError> = std::result::Result<T, E>;
