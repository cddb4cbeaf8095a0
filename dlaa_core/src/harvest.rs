//! Reads the TAA pass's inputs from the pipeline state bound for the draw.
//!
//! The slots below are the host's shader contract; they are not discovered
//! at runtime.

use crate::device::{BoundView, GraphicsContext, RenderTarget, ResourceHandle};
use crate::feature::FrameResources;
use crate::motion_vectors::PreprocessInputs;

pub const COLOR_SRV_SLOT: u32 = 0;
pub const DEPTH_SRV_SLOT: u32 = 3;
pub const VELOCITY_SRV_SLOT: u32 = 6;
pub const TAA_CB_SLOT: u32 = 0;

/// Everything bound to the TAA draw that the upscaling pass consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaaInputs {
    pub constants: ResourceHandle,
    pub color: BoundView,
    pub depth: BoundView,
    pub velocity: BoundView,
}

/// Which binding was missing when harvesting failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    Constants,
    Color,
    Depth,
    Velocity,
}

impl TaaInputs {
    pub fn harvest(ctx: &dyn GraphicsContext) -> Result<Self, MissingInput> {
        Ok(Self {
            constants: ctx.ps_constant_buffer(TAA_CB_SLOT).ok_or(MissingInput::Constants)?,
            color: ctx.ps_shader_resource(COLOR_SRV_SLOT).ok_or(MissingInput::Color)?,
            depth: ctx.ps_shader_resource(DEPTH_SRV_SLOT).ok_or(MissingInput::Depth)?,
            velocity: ctx.ps_shader_resource(VELOCITY_SRV_SLOT).ok_or(MissingInput::Velocity)?,
        })
    }

    pub fn preprocess_inputs(&self) -> PreprocessInputs {
        PreprocessInputs {
            velocity: self.velocity,
            depth: self.depth,
            constants: self.constants,
        }
    }

    /// Upscaler resources, writing in place over `target`.
    pub fn frame_resources(&self, target: &RenderTarget) -> FrameResources {
        FrameResources {
            color: self.color.resource,
            depth: self.depth.resource,
            output: target.resource,
        }
    }
}
