//! Device-session state and the host event handlers.
//!
//! One `HookSession` exists per graphics device: built on device init, torn
//! down on device destroy. Every host callback is routed to one of its
//! `on_*` methods on the render thread.

use log::{debug, info, trace, warn};

use crate::config::{clamp_sharpen_intensity, ConfigStore, HookSettings, RenderPreset};
use crate::device::{GraphicsContext, MapAccess, NativeHandle, PipelineHandle, ResourceHandle};
use crate::feature::{FeatureLifecycle, LifecycleState};
use crate::frame::FrameBoundaryTracker;
use crate::harvest::TaaInputs;
use crate::jitter::{JitterOffset, JitterTracker};
use crate::sdk::UpscalerSdk;
use crate::shader::{self, CreationRequestId, PipelineRegistry, PipelineSubobject, ShaderBlobs, ShaderRole};
use crate::sharpen::SharpenInjector;

pub struct HookSession<S: UpscalerSdk> {
    sdk: S,
    blobs: ShaderBlobs,
    settings: HookSettings,
    registry: PipelineRegistry,
    feature: FeatureLifecycle,
    jitter: JitterTracker,
    frames: FrameBoundaryTracker,
    sharpen: SharpenInjector,
}

impl<S: UpscalerSdk> HookSession<S> {
    /// Device-init handler: load settings, probe the SDK, create device objects.
    pub fn on_init_device(
        sdk: S,
        ctx: &mut dyn GraphicsContext,
        config: &dyn ConfigStore,
        blobs: ShaderBlobs,
    ) -> Self {
        let settings = HookSettings::load(config);

        let mut session = Self {
            sdk,
            blobs,
            settings,
            registry: PipelineRegistry::new(),
            feature: FeatureLifecycle::new(),
            jitter: JitterTracker::new(),
            frames: FrameBoundaryTracker::new(),
            sharpen: SharpenInjector::disabled(),
        };

        match &session.blobs.prepare_motion_vectors {
            Some(bytecode) => {
                if let Err(e) = session.feature.probe(&mut session.sdk, ctx, bytecode) {
                    warn!("DLAA unavailable on this device: {}", e);
                }
            }
            None => warn!("DLAA unavailable: no motion-vector shader"),
        }

        session.sharpen = SharpenInjector::create(ctx).unwrap_or_else(|e| {
            warn!("Sharpen intensity will not be injected: {}", e);
            SharpenInjector::disabled()
        });

        info!(
            "Device session ready (DLAA: {:?}, sharpen: {}, preset: {})",
            session.feature.state(),
            session.settings.sharpen_intensity,
            session.settings.preset.label()
        );
        session
    }

    /// Device-destroy handler. Releases every object the session created.
    pub fn on_destroy_device(mut self, ctx: &mut dyn GraphicsContext) -> S {
        self.feature.teardown(&mut self.sdk, ctx);
        self.sharpen.destroy(ctx);
        self.registry.clear();
        self.jitter.reset();
        info!("Device session destroyed");
        self.sdk
    }

    /// Device-destroy handler when no context can be built for `device`. The
    /// SDK is still shut down; device objects go with the device.
    pub fn on_device_lost(mut self, device: NativeHandle) -> S {
        self.feature.abandon(&mut self.sdk, device);
        self.registry.clear();
        self.jitter.reset();
        warn!("Device session dropped without a context; device objects are left to the driver");
        self.sdk
    }

    /// Pipeline-create handler. Returns whether bytecode was replaced.
    pub fn on_create_pipeline(&mut self, request: CreationRequestId, subobjects: &mut [PipelineSubobject<'_>]) -> bool {
        let outcome = shader::inspect_pipeline(subobjects, &self.blobs);
        self.registry.record_creation(request, outcome);
        outcome.is_replaced()
    }

    /// Pipeline-init handler for the pipeline created by `request`.
    pub fn on_init_pipeline(&mut self, request: CreationRequestId, pipeline: PipelineHandle) {
        self.registry.complete_creation(request, pipeline);
    }

    pub fn on_destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        self.registry.unregister(pipeline);
    }

    /// Draw handler. `true` means the draw was fully serviced and the host
    /// must skip it.
    pub fn on_draw(&mut self, ctx: &mut dyn GraphicsContext) -> bool {
        let Some(role) = ctx.bound_pixel_shader().and_then(|ps| self.registry.lookup(ps)) else {
            return false;
        };

        match role {
            ShaderRole::Taa if self.feature.is_available() => self.upscale_taa_draw(ctx),
            ShaderRole::Taa => false,
            ShaderRole::Sharpen => {
                self.sharpen.inject(ctx, self.settings.sharpen_intensity);
                false
            }
        }
    }

    fn upscale_taa_draw(&mut self, ctx: &mut dyn GraphicsContext) -> bool {
        let Some(target) = ctx.bound_render_target() else {
            trace!("TAA draw without a render target, leaving it alone");
            return false;
        };

        if self
            .feature
            .ensure_active(&mut self.sdk, ctx, target.dimensions, self.settings.preset)
            .is_err()
        {
            return false;
        }

        let inputs = match TaaInputs::harvest(ctx) {
            Ok(inputs) => inputs,
            Err(missing) => {
                trace!("TAA draw is missing {:?}, leaving it alone", missing);
                return false;
            }
        };

        self.feature
            .preprocess_motion_vectors(ctx, &inputs.preprocess_inputs());

        let reset = self.frames.reset_pending();
        if let Err(e) = self.feature.evaluate(
            &mut self.sdk,
            ctx,
            &inputs.frame_resources(&target),
            self.jitter.offset(),
            reset,
        ) {
            debug!("DLAA evaluation failed: {}", e);
        }

        self.frames.mark_invoked();
        true
    }

    /// Buffer-map handler.
    ///
    /// # Safety
    ///
    /// `data` must be the host's mapping of `resource` and stay readable until
    /// [`HookSession::on_unmap_buffer`] is called for the same resource.
    pub unsafe fn on_map_buffer(
        &mut self,
        ctx: &dyn GraphicsContext,
        resource: ResourceHandle,
        access: MapAccess,
        data: *mut u8,
    ) {
        if access != MapAccess::WriteDiscard {
            return;
        }
        let byte_width = ctx.buffer_byte_width(resource);
        // SAFETY: forwarded from this function's contract.
        unsafe { self.jitter.on_map(resource, byte_width, access, data) };
    }

    pub fn on_unmap_buffer(&mut self, resource: ResourceHandle) {
        self.jitter.on_unmap(resource);
    }

    /// Present handler; runs between the last draw of a frame and the first
    /// of the next.
    pub fn on_present(&mut self) {
        self.frames.on_present();
        self.registry.purge_pending();
    }

    /// Overlay setter; clamps to the supported range and persists.
    pub fn set_sharpen_intensity(&mut self, config: &mut dyn ConfigStore, intensity: f32) {
        self.settings.sharpen_intensity = clamp_sharpen_intensity(intensity);
        self.settings.store_sharpen_intensity(config);
    }

    /// Overlay setter; a different preset recreates the feature on the next draw.
    pub fn set_preset(&mut self, config: &mut dyn ConfigStore, preset: RenderPreset) {
        if self.settings.preset == preset {
            return;
        }
        self.settings.preset = preset;
        self.settings.store_preset(config);
        self.feature.request_reinitialize();
    }

    pub fn settings(&self) -> &HookSettings {
        &self.settings
    }

    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    pub fn feature(&self) -> &FeatureLifecycle {
        &self.feature
    }

    pub fn feature_state(&self) -> LifecycleState {
        self.feature.state()
    }

    pub fn jitter(&self) -> JitterOffset {
        self.jitter.offset()
    }

    pub fn sharpen_buffer(&self) -> Option<ResourceHandle> {
        self.sharpen.buffer()
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    pub fn sdk_mut(&mut self) -> &mut S {
        &mut self.sdk
    }
}
