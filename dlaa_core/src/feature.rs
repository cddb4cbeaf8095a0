//! Ownership and lifecycle of the NGX super-sampling feature.
//!
//! The feature is tied to one frame size. It is created lazily on the first
//! TAA draw, recreated when the render target size or the preset changes, and
//! released with the device. Any SDK failure is terminal for the device
//! session: DLAA stays off and the host's own TAA keeps running.

use log::{debug, info, warn};

use crate::config::RenderPreset;
use crate::device::{FrameDimensions, GraphicsContext, NativeHandle, ResourceHandle};
use crate::error::{HookError, Result, UnsupportedReason};
use crate::jitter::JitterOffset;
use crate::motion_vectors::{MotionVectorPreprocessor, MotionVectorSurface, PreprocessInputs};
use crate::sdk::{EvaluationParams, FeatureCreateInfo, FeatureHandle, ParameterHandle, UpscalerSdk};

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not probed yet, or the device cannot run the feature. Terminal once probed.
    Uninitialized,
    /// Supported; the feature is created on the next TAA draw.
    Capable,
    /// Feature and motion-vector surface exist for the current frame size.
    Active,
    /// Creation failed; never retried for this device.
    Disabled,
    /// The device was destroyed.
    Destroyed,
}

#[derive(Debug)]
struct ActiveFeature {
    handle: FeatureHandle,
    parameters: ParameterHandle,
    surface: MotionVectorSurface,
}

impl ActiveFeature {
    fn dimensions(&self) -> FrameDimensions {
        self.surface.dimensions()
    }
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Capable,
    Active(ActiveFeature),
    Disabled,
    Destroyed,
}

/// Resources the upscaler reads and writes for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameResources {
    pub color: ResourceHandle,
    pub depth: ResourceHandle,
    /// The TAA render target, overwritten with the upscaled result.
    pub output: ResourceHandle,
}

#[derive(Debug)]
pub struct FeatureLifecycle {
    state: State,
    capability_parameters: Option<ParameterHandle>,
    preprocessor: Option<MotionVectorPreprocessor>,
    reinitialize_requested: bool,
    sdk_initialized: bool,
}

impl Default for FeatureLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureLifecycle {
    pub fn new() -> Self {
        Self {
            state: State::Uninitialized,
            capability_parameters: None,
            preprocessor: None,
            reinitialize_requested: false,
            sdk_initialized: false,
        }
    }

    pub fn state(&self) -> LifecycleState {
        match self.state {
            State::Uninitialized => LifecycleState::Uninitialized,
            State::Capable => LifecycleState::Capable,
            State::Active(_) => LifecycleState::Active,
            State::Disabled => LifecycleState::Disabled,
            State::Destroyed => LifecycleState::Destroyed,
        }
    }

    /// Whether TAA draws should be intercepted at all.
    pub fn is_available(&self) -> bool {
        matches!(self.state, State::Capable | State::Active(_))
    }

    pub fn active_feature(&self) -> Option<FeatureHandle> {
        match &self.state {
            State::Active(active) => Some(active.handle),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn active_dimensions(&self) -> Option<FrameDimensions> {
        match &self.state {
            State::Active(active) => Some(active.dimensions()),
            _ => None,
        }
    }

    pub fn motion_vector_surface(&self) -> Option<&MotionVectorSurface> {
        match &self.state {
            State::Active(active) => Some(&active.surface),
            _ => None,
        }
    }

    /// Check device support and create the preprocessing shader. Leaves the
    /// lifecycle `Uninitialized` for good on any failure.
    pub fn probe(
        &mut self,
        sdk: &mut dyn UpscalerSdk,
        ctx: &mut dyn GraphicsContext,
        preprocess_bytecode: &[u8],
    ) -> Result<()> {
        if !matches!(self.state, State::Uninitialized) {
            return Ok(());
        }

        sdk.initialize(ctx.native_device()).map_err(HookError::sdk("Init"))?;
        self.sdk_initialized = true;
        let capabilities = sdk
            .capability_parameters()
            .map_err(HookError::sdk("GetCapabilityParameters"))?;

        let supported = match sdk.super_sampling_capability(capabilities) {
            Ok(caps) if caps.needs_updated_driver => Err(HookError::Unsupported(UnsupportedReason::NeedsUpdatedDriver)),
            Ok(caps) if !caps.available => Err(HookError::Unsupported(UnsupportedReason::NotAvailable)),
            Ok(caps) if !caps.feature_init_result => Err(HookError::Unsupported(UnsupportedReason::FeatureInitFailed)),
            Ok(_) => Ok(()),
            Err(status) => Err(HookError::Sdk {
                call: "Parameter_GetI",
                status,
            }),
        };
        if let Err(e) = supported {
            sdk.destroy_parameters(capabilities);
            return Err(e);
        }
        self.capability_parameters = Some(capabilities);

        match MotionVectorPreprocessor::create(ctx, preprocess_bytecode) {
            Ok(preprocessor) => self.preprocessor = Some(preprocessor),
            Err(e) => {
                sdk.destroy_parameters(capabilities);
                self.capability_parameters = None;
                return Err(e.into());
            }
        }

        info!("Super sampling available, DLAA enabled");
        self.state = State::Capable;
        Ok(())
    }

    /// Recreate the feature before the next evaluation (e.g. preset change).
    pub fn request_reinitialize(&mut self) {
        self.reinitialize_requested = true;
    }

    #[cfg(test)]
    pub fn reinitialize_requested(&self) -> bool {
        self.reinitialize_requested
    }

    /// Make sure a feature sized to `dimensions` exists. A size or preset change
    /// releases the current one first. Failure disables the feature for good.
    pub fn ensure_active(
        &mut self,
        sdk: &mut dyn UpscalerSdk,
        ctx: &mut dyn GraphicsContext,
        dimensions: FrameDimensions,
        preset: RenderPreset,
    ) -> Result<()> {
        if let State::Active(active) = &self.state {
            if active.dimensions() == dimensions && !self.reinitialize_requested {
                return Ok(());
            }
            debug!(
                "Releasing {} feature (target {}, reinitialize: {})",
                active.dimensions(),
                dimensions,
                self.reinitialize_requested
            );
            self.release_active(sdk, ctx);
        }

        if !matches!(self.state, State::Capable) {
            return Err(HookError::Unsupported(UnsupportedReason::NotAvailable));
        }

        match Self::create_feature(sdk, ctx, dimensions, preset) {
            Ok(active) => {
                info!("Created DLAA feature at {} ({})", dimensions, preset.label());
                self.state = State::Active(active);
                self.reinitialize_requested = false;
                Ok(())
            }
            Err(e) => {
                warn!("Disabling DLAA for this device: {}", e);
                self.state = State::Disabled;
                Err(e)
            }
        }
    }

    fn create_feature(
        sdk: &mut dyn UpscalerSdk,
        ctx: &mut dyn GraphicsContext,
        dimensions: FrameDimensions,
        preset: RenderPreset,
    ) -> Result<ActiveFeature> {
        let parameters = sdk
            .allocate_parameters()
            .map_err(HookError::sdk("AllocateParameters"))?;

        let info = FeatureCreateInfo::dlaa(dimensions, preset);
        let handle = match sdk.create_feature(ctx.native_context(), parameters, &info) {
            Ok(handle) => handle,
            Err(status) => {
                sdk.destroy_parameters(parameters);
                return Err(HookError::FeatureCreation(status));
            }
        };

        match MotionVectorSurface::create(ctx, dimensions) {
            Ok(surface) => Ok(ActiveFeature {
                handle,
                parameters,
                surface,
            }),
            Err(e) => {
                sdk.destroy_parameters(parameters);
                sdk.release_feature(handle);
                Err(e.into())
            }
        }
    }

    /// Destroy the feature, its parameters and the motion-vector surface,
    /// returning to `Capable`.
    pub fn release_active(&mut self, sdk: &mut dyn UpscalerSdk, ctx: &mut dyn GraphicsContext) {
        if !matches!(self.state, State::Active(_)) {
            return;
        }
        if let State::Active(active) = std::mem::replace(&mut self.state, State::Capable) {
            sdk.destroy_parameters(active.parameters);
            sdk.release_feature(active.handle);
            active.surface.destroy(ctx);
        }
    }

    /// Run the motion-vector pass into the active surface.
    pub fn preprocess_motion_vectors(&self, ctx: &mut dyn GraphicsContext, inputs: &PreprocessInputs) {
        if let (State::Active(active), Some(preprocessor)) = (&self.state, &self.preprocessor) {
            preprocessor.dispatch(ctx, inputs, &active.surface);
        }
    }

    /// Evaluate the feature, writing into `resources.output`.
    pub fn evaluate(
        &self,
        sdk: &mut dyn UpscalerSdk,
        ctx: &mut dyn GraphicsContext,
        resources: &FrameResources,
        jitter: JitterOffset,
        reset: bool,
    ) -> Result<()> {
        let State::Active(active) = &self.state else {
            return Err(HookError::Unsupported(UnsupportedReason::NotAvailable));
        };
        let dimensions = active.dimensions();
        let params = EvaluationParams {
            color: resources.color,
            output: resources.output,
            depth: resources.depth,
            motion_vectors: active.surface.texture(),
            jitter_offset: jitter.to_pixels(dimensions),
            mv_scale: [1.0, 1.0],
            reset,
            render_subrect: dimensions,
        };
        sdk.evaluate(ctx.native_context(), active.handle, active.parameters, &params)
            .map_err(HookError::sdk("EvaluateFeature"))
    }

    /// Release everything owned for the device and stop for good.
    pub fn teardown(&mut self, sdk: &mut dyn UpscalerSdk, ctx: &mut dyn GraphicsContext) {
        self.release_active(sdk, ctx);
        if let Some(preprocessor) = self.preprocessor.take() {
            preprocessor.destroy(ctx);
        }
        self.shutdown_sdk(sdk, ctx.native_device());
    }

    /// Teardown for a device that can no longer be reached through a context.
    /// SDK objects are still released; device objects are left to the driver.
    pub fn abandon(&mut self, sdk: &mut dyn UpscalerSdk, device: NativeHandle) {
        if let State::Active(active) = std::mem::replace(&mut self.state, State::Destroyed) {
            sdk.destroy_parameters(active.parameters);
            sdk.release_feature(active.handle);
        }
        self.preprocessor = None;
        self.shutdown_sdk(sdk, device);
    }

    fn shutdown_sdk(&mut self, sdk: &mut dyn UpscalerSdk, device: NativeHandle) {
        if let Some(capabilities) = self.capability_parameters.take() {
            sdk.destroy_parameters(capabilities);
        }
        if std::mem::take(&mut self.sdk_initialized) {
            sdk.shutdown(device);
        }
        self.state = State::Destroyed;
        self.reinitialize_requested = false;
    }
}
