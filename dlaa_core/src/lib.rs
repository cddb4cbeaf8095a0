//! DLAA hook core: shader recognition, the NGX feature lifecycle and the
//! per-draw upscaling pass, independent of the add-on host's ABI.

pub mod config;
pub mod device;
pub mod error;
pub mod feature;
pub mod frame;
pub mod harvest;
pub mod jitter;
pub mod motion_vectors;
pub mod sdk;
pub mod session;
pub mod shader;
pub mod sharpen;

#[cfg(all(windows, feature = "d3d11"))]
pub mod d3d11;
#[cfg(all(windows, feature = "ngx"))]
pub mod ngx;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigStore, HookSettings, RenderPreset};
pub use device::{FrameDimensions, GraphicsContext, MapAccess, PipelineHandle, ResourceHandle};
pub use error::{HookError, Result};
pub use feature::LifecycleState;
pub use sdk::{SdkStatus, UpscalerSdk};
pub use session::HookSession;
pub use shader::{CreationRequestId, PipelineSubobject, ShaderBlobs, ShaderCode, SubobjectKind};
