//! Graphics device abstraction used by the hook.
//!
//! Handles are opaque 64-bit values assigned by the device, the same shape the
//! host add-on API hands out. The D3D11 backend stores raw COM pointers in them.

/// Defines a transparent `u64` handle newtype.
macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

handle_type!(
    /// A realized pipeline (for D3D11, the pixel shader object).
    PipelineHandle
);
handle_type!(
    /// A buffer or texture.
    ResourceHandle
);
handle_type!(
    /// A shader-resource or unordered-access view.
    ViewHandle
);
handle_type!(
    /// A compute shader created by the hook.
    ShaderHandle
);
handle_type!(
    /// Native device or context pointer handed to the upscaling SDK.
    NativeHandle
);

/// Size of the render target the TAA pass writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Work-group counts covering the frame with `tile`x`tile` groups.
    pub const fn dispatch_groups(self, tile: u32) -> (u32, u32) {
        (self.width.div_ceil(tile), self.height.div_ceil(tile))
    }
}

impl std::fmt::Display for FrameDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The render target bound at output slot 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub resource: ResourceHandle,
    pub dimensions: FrameDimensions,
}

/// A shader-resource view together with the resource backing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundView {
    pub view: ViewHandle,
    pub resource: ResourceHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// Two 16-bit float channels, the layout NGX expects for motion vectors.
    R16G16Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub dimensions: FrameDimensions,
    pub format: TextureFormat,
    /// Bound as both shader resource and unordered access when set.
    pub unordered_access: bool,
}

/// Access mode reported by the host for a buffer map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
    WriteDiscard,
}

#[derive(Debug, thiserror::Error)]
#[error("device call `{call}` failed{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct DeviceError {
    pub call: &'static str,
    pub detail: Option<String>,
}

impl DeviceError {
    pub fn new(call: &'static str) -> Self {
        Self { call, detail: None }
    }

    pub fn with_detail(call: &'static str, detail: impl Into<String>) -> Self {
        Self {
            call,
            detail: Some(detail.into()),
        }
    }
}

/// Device and immediate-context services the hook needs.
///
/// All calls are synchronous and happen on the host's render thread.
pub trait GraphicsContext {
    /// Native device pointer (e.g. `ID3D11Device*`).
    fn native_device(&self) -> NativeHandle;
    /// Native immediate context pointer (e.g. `ID3D11DeviceContext*`).
    fn native_context(&self) -> NativeHandle;

    fn create_compute_shader(&mut self, bytecode: &[u8]) -> Result<ShaderHandle, DeviceError>;
    /// Dynamic, CPU-writable constant buffer.
    fn create_constant_buffer(&mut self, byte_width: u32) -> Result<ResourceHandle, DeviceError>;
    fn create_texture_2d(&mut self, desc: &TextureDesc) -> Result<ResourceHandle, DeviceError>;
    fn create_unordered_access_view(
        &mut self,
        texture: ResourceHandle,
        format: TextureFormat,
    ) -> Result<ViewHandle, DeviceError>;

    fn destroy_shader(&mut self, shader: ShaderHandle);
    fn destroy_resource(&mut self, resource: ResourceHandle);
    fn destroy_view(&mut self, view: ViewHandle);

    /// Byte width of a buffer, `None` if the resource is not a buffer.
    fn buffer_byte_width(&self, resource: ResourceHandle) -> Option<u32>;

    fn bound_pixel_shader(&self) -> Option<PipelineHandle>;
    fn bound_render_target(&self) -> Option<RenderTarget>;
    fn ps_constant_buffer(&self, slot: u32) -> Option<ResourceHandle>;
    fn ps_shader_resource(&self, slot: u32) -> Option<BoundView>;
    fn set_ps_constant_buffer(&mut self, slot: u32, buffer: Option<ResourceHandle>);

    /// Map with write-discard, copy `data` to the start of the buffer, unmap.
    fn write_buffer(&mut self, buffer: ResourceHandle, data: &[u8]) -> Result<(), DeviceError>;

    fn set_compute_shader(&mut self, shader: Option<ShaderHandle>);
    fn set_cs_shader_resources(&mut self, start_slot: u32, views: &[Option<ViewHandle>]);
    fn set_cs_constant_buffers(&mut self, start_slot: u32, buffers: &[Option<ResourceHandle>]);
    fn set_cs_unordered_access_views(&mut self, start_slot: u32, views: &[Option<ViewHandle>]);
    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32);
}
