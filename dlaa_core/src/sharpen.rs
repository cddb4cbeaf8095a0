//! Feeds the user's sharpen intensity to the replacement sharpen shader.

use log::{trace, warn};

use crate::device::{DeviceError, GraphicsContext, ResourceHandle};

/// Pixel-stage constant buffer slot the replacement shader reads (`cb1`).
pub const SHARPEN_CB_SLOT: u32 = 1;
/// One float padded to a 16-byte constant register.
pub const SHARPEN_CB_BYTE_WIDTH: u32 = 16;

#[derive(Debug, Default)]
pub struct SharpenInjector {
    buffer: Option<ResourceHandle>,
}

impl SharpenInjector {
    pub fn create(ctx: &mut dyn GraphicsContext) -> Result<Self, DeviceError> {
        let buffer = ctx.create_constant_buffer(SHARPEN_CB_BYTE_WIDTH)?;
        Ok(Self { buffer: Some(buffer) })
    }

    /// Injector without a buffer; every inject is skipped.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> Option<ResourceHandle> {
        self.buffer
    }

    /// Write `intensity` into the buffer and bind it for the current draw.
    pub fn inject(&self, ctx: &mut dyn GraphicsContext, intensity: f32) {
        let Some(buffer) = self.buffer else {
            return;
        };
        let mut constants = [0.0f32; 4];
        constants[0] = intensity;
        match ctx.write_buffer(buffer, bytemuck::cast_slice(&constants)) {
            Ok(()) => trace!("Injected sharpen intensity {}", intensity),
            Err(e) => warn!("Failed to update sharpen constants: {}", e),
        }
        ctx.set_ps_constant_buffer(SHARPEN_CB_SLOT, Some(buffer));
    }

    pub fn destroy(&mut self, ctx: &mut dyn GraphicsContext) {
        if let Some(buffer) = self.buffer.take() {
            ctx.destroy_resource(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockContext;

    #[test]
    fn inject_writes_first_float_and_binds_slot_one() {
        let mut ctx = MockContext::new();
        let injector = SharpenInjector::create(&mut ctx).unwrap();
        let buffer = injector.buffer().unwrap();

        injector.inject(&mut ctx, 1.3);

        assert_eq!(ctx.buffer_floats(buffer)[0], 1.3);
        assert_eq!(ctx.ps_constant_buffer(SHARPEN_CB_SLOT), Some(buffer));
        assert_eq!(ctx.byte_width_of(buffer), Some(SHARPEN_CB_BYTE_WIDTH));
    }

    #[test]
    fn disabled_injector_touches_nothing() {
        let mut ctx = MockContext::new();
        SharpenInjector::disabled().inject(&mut ctx, 1.0);
        assert_eq!(ctx.ps_constant_buffer(SHARPEN_CB_SLOT), None);
    }

    #[test]
    fn destroy_releases_buffer() {
        let mut ctx = MockContext::new();
        let mut injector = SharpenInjector::create(&mut ctx).unwrap();
        injector.destroy(&mut ctx);
        assert_eq!(ctx.live_objects(), 0);
        assert!(injector.buffer().is_none());
    }
}
