//! Interface of the external super-sampling SDK (NVIDIA NGX).

use crate::config::RenderPreset;
use crate::device::{FrameDimensions, NativeHandle, ResourceHandle};

/// Raw NGX result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SdkStatus(pub u32);

impl SdkStatus {
    pub const SUCCESS: SdkStatus = SdkStatus(0x1);
    pub const FAIL: SdkStatus = SdkStatus(0xBAD0_0000);
    pub const FEATURE_NOT_SUPPORTED: SdkStatus = SdkStatus(0xBAD0_0001);
    pub const INVALID_PARAMETER: SdkStatus = SdkStatus(0xBAD0_000F);

    pub const fn is_failed(self) -> bool {
        (self.0 & 0xFFF0_0000) == Self::FAIL.0
    }

    /// Turn a raw code into a `Result`, keeping the code on failure.
    pub fn into_result(self) -> Result<(), SdkStatus> {
        if self.is_failed() {
            Err(self)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Display for SdkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010X}", self.0)
    }
}

/// Handle to an SDK parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterHandle(pub u64);

/// Handle to a created super-sampling feature instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureHandle(pub u64);

/// What the capability parameters say about super sampling on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuperSamplingCapability {
    pub needs_updated_driver: bool,
    pub available: bool,
    pub feature_init_result: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfQuality {
    MaxPerformance,
    Balanced,
    MaxQuality,
    UltraPerformance,
    UltraQuality,
    /// Render size equals output size.
    Dlaa,
}

/// Arguments for feature creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureCreateInfo {
    pub render: FrameDimensions,
    pub output: FrameDimensions,
    pub quality: PerfQuality,
    pub hdr: bool,
    pub output_subrects: bool,
    /// Applied to every quality-tier preset hint.
    pub preset: RenderPreset,
}

impl FeatureCreateInfo {
    /// DLAA at `dimensions`: same render and output size, HDR input.
    pub fn dlaa(dimensions: FrameDimensions, preset: RenderPreset) -> Self {
        Self {
            render: dimensions,
            output: dimensions,
            quality: PerfQuality::Dlaa,
            hdr: true,
            output_subrects: false,
            preset,
        }
    }
}

/// Per-evaluation inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationParams {
    pub color: ResourceHandle,
    /// Written in place.
    pub output: ResourceHandle,
    pub depth: ResourceHandle,
    pub motion_vectors: ResourceHandle,
    /// Jitter in pixels.
    pub jitter_offset: [f32; 2],
    pub mv_scale: [f32; 2],
    pub reset: bool,
    pub render_subrect: FrameDimensions,
}

/// The calls the hook makes into the SDK. Every call returns the SDK's own
/// status on failure.
pub trait UpscalerSdk {
    fn initialize(&mut self, device: NativeHandle) -> Result<(), SdkStatus>;
    fn capability_parameters(&mut self) -> Result<ParameterHandle, SdkStatus>;
    fn super_sampling_capability(
        &mut self,
        capabilities: ParameterHandle,
    ) -> Result<SuperSamplingCapability, SdkStatus>;
    fn allocate_parameters(&mut self) -> Result<ParameterHandle, SdkStatus>;
    fn destroy_parameters(&mut self, parameters: ParameterHandle);
    fn create_feature(
        &mut self,
        context: NativeHandle,
        parameters: ParameterHandle,
        info: &FeatureCreateInfo,
    ) -> Result<FeatureHandle, SdkStatus>;
    fn release_feature(&mut self, feature: FeatureHandle);
    fn evaluate(
        &mut self,
        context: NativeHandle,
        feature: FeatureHandle,
        parameters: ParameterHandle,
        params: &EvaluationParams,
    ) -> Result<(), SdkStatus>;
    fn shutdown(&mut self, device: NativeHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_mask() {
        assert!(SdkStatus::SUCCESS.into_result().is_ok());
        assert_eq!(SdkStatus::FEATURE_NOT_SUPPORTED.into_result(), Err(SdkStatus::FEATURE_NOT_SUPPORTED));
        // Warnings outside the 0xBAD range are not failures
        assert!(!SdkStatus(0x2).is_failed());
        assert_eq!(SdkStatus::INVALID_PARAMETER.to_string(), "0xBAD0000F");
    }
}
