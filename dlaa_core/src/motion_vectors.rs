//! Converts the host's velocity + depth into the motion-vector layout NGX
//! expects, with one compute dispatch per upscaled frame.

use log::debug;

use crate::device::{
    BoundView, DeviceError, FrameDimensions, GraphicsContext, ResourceHandle, ShaderHandle, TextureDesc,
    TextureFormat, ViewHandle,
};

/// Thread-group edge of the preprocessing shader (`[numthreads(8, 8, 1)]`).
pub const TILE_SIZE: u32 = 8;
pub const MOTION_VECTOR_FORMAT: TextureFormat = TextureFormat::R16G16Float;

/// Intermediate motion-vector texture and its writable view.
#[derive(Debug, PartialEq, Eq)]
pub struct MotionVectorSurface {
    texture: ResourceHandle,
    uav: ViewHandle,
    dimensions: FrameDimensions,
}

impl MotionVectorSurface {
    pub fn create(ctx: &mut dyn GraphicsContext, dimensions: FrameDimensions) -> Result<Self, DeviceError> {
        let texture = ctx.create_texture_2d(&TextureDesc {
            dimensions,
            format: MOTION_VECTOR_FORMAT,
            unordered_access: true,
        })?;
        let uav = match ctx.create_unordered_access_view(texture, MOTION_VECTOR_FORMAT) {
            Ok(uav) => uav,
            Err(e) => {
                ctx.destroy_resource(texture);
                return Err(e);
            }
        };
        debug!("Created {} motion-vector surface", dimensions);
        Ok(Self {
            texture,
            uav,
            dimensions,
        })
    }

    pub fn texture(&self) -> ResourceHandle {
        self.texture
    }

    pub fn uav(&self) -> ViewHandle {
        self.uav
    }

    pub fn dimensions(&self) -> FrameDimensions {
        self.dimensions
    }

    pub fn destroy(self, ctx: &mut dyn GraphicsContext) {
        ctx.destroy_view(self.uav);
        ctx.destroy_resource(self.texture);
    }
}

/// Native inputs of the preprocessing pass.
#[derive(Debug, Clone, Copy)]
pub struct PreprocessInputs {
    pub velocity: BoundView,
    pub depth: BoundView,
    /// The TAA pass's constant buffer, read for the frame's reprojection data.
    pub constants: ResourceHandle,
}

/// Owns the compute shader and records its dispatch.
#[derive(Debug)]
pub struct MotionVectorPreprocessor {
    shader: ShaderHandle,
}

impl MotionVectorPreprocessor {
    pub fn create(ctx: &mut dyn GraphicsContext, bytecode: &[u8]) -> Result<Self, DeviceError> {
        let shader = ctx.create_compute_shader(bytecode)?;
        Ok(Self { shader })
    }

    pub fn shader(&self) -> ShaderHandle {
        self.shader
    }

    /// Fill `surface` from the host's velocity and depth.
    pub fn dispatch(&self, ctx: &mut dyn GraphicsContext, inputs: &PreprocessInputs, surface: &MotionVectorSurface) {
        let (groups_x, groups_y) = surface.dimensions().dispatch_groups(TILE_SIZE);

        ctx.set_compute_shader(Some(self.shader));
        ctx.set_cs_shader_resources(0, &[Some(inputs.velocity.view), Some(inputs.depth.view)]);
        ctx.set_cs_constant_buffers(0, &[Some(inputs.constants)]);
        ctx.set_cs_unordered_access_views(0, &[Some(surface.uav())]);
        ctx.dispatch(groups_x, groups_y, 1);

        // The TAA draw samples these views in the pixel stage right after
        ctx.set_cs_shader_resources(0, &[None, None]);
        ctx.set_cs_unordered_access_views(0, &[None]);
    }

    pub fn destroy(self, ctx: &mut dyn GraphicsContext) {
        ctx.destroy_shader(self.shader);
    }
}
