//! `GraphicsContext` over a D3D11 device and its immediate context.
//!
//! Handles are raw COM pointers. Objects the hook creates keep one reference
//! inside their handle (`into_raw`) until destroyed; objects queried from the
//! pipeline state are released right away and the handle only borrows the
//! host's reference.

use std::ffi::c_void;

use log::warn;
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT, DXGI_FORMAT_R16G16_FLOAT, DXGI_SAMPLE_DESC};

use crate::device::{
    BoundView, DeviceError, FrameDimensions, GraphicsContext, NativeHandle, PipelineHandle, RenderTarget,
    ResourceHandle, ShaderHandle, TextureDesc, TextureFormat, ViewHandle,
};

fn dxgi_format(format: TextureFormat) -> DXGI_FORMAT {
    match format {
        TextureFormat::R16G16Float => DXGI_FORMAT_R16G16_FLOAT,
    }
}

fn to_handle<T: Interface>(object: T) -> u64 {
    object.into_raw() as u64
}

fn peek_handle<T: Interface>(object: &T) -> u64 {
    object.as_raw() as u64
}

fn as_raw(handle: u64) -> *mut c_void {
    handle as usize as *mut c_void
}

/// Borrow the object behind `handle`.
///
/// # Safety
///
/// `handle` must be zero or a live pointer to an object implementing `T`.
unsafe fn borrow<T: Interface>(handle: u64) -> Option<T> {
    let raw = as_raw(handle);
    // SAFETY: forwarded from this function's contract.
    unsafe { T::from_raw_borrowed(&raw).cloned() }
}

/// Release the reference held by a handle created with `to_handle`.
///
/// # Safety
///
/// `handle` must come from `to_handle::<T>` and not be released twice.
unsafe fn release<T: Interface>(handle: u64) {
    if handle != 0 {
        // SAFETY: forwarded from this function's contract.
        drop(unsafe { T::from_raw(as_raw(handle)) });
    }
}

pub struct D3d11Context {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
}

impl D3d11Context {
    /// Wrap the host's device and its immediate context.
    ///
    /// # Safety
    ///
    /// `device` must be a live `ID3D11Device*`.
    pub unsafe fn from_device(device: *mut c_void) -> Option<Self> {
        // SAFETY: forwarded from this function's contract.
        let device = unsafe { ID3D11Device::from_raw_borrowed(&device) }?.clone();
        let context = unsafe { device.GetImmediateContext() }.ok()?;
        Some(Self { device, context })
    }

    /// Wrap a device context and the device that owns it.
    ///
    /// # Safety
    ///
    /// `context` must be a live `ID3D11DeviceContext*`.
    pub unsafe fn from_context(context: *mut c_void) -> Option<Self> {
        // SAFETY: forwarded from this function's contract.
        let context = unsafe { ID3D11DeviceContext::from_raw_borrowed(&context) }?.clone();
        let device = unsafe { context.GetDevice() }.ok()?;
        Some(Self { device, context })
    }

    fn resource_of(view: &ID3D11View) -> Option<ResourceHandle> {
        let resource = unsafe { view.GetResource() }.ok()?;
        Some(ResourceHandle(peek_handle(&resource)))
    }

    fn texture_dimensions(resource: &ID3D11Resource) -> Option<FrameDimensions> {
        let texture: ID3D11Texture2D = resource.cast().ok()?;
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };
        Some(FrameDimensions::new(desc.Width, desc.Height))
    }
}

impl GraphicsContext for D3d11Context {
    fn native_device(&self) -> NativeHandle {
        NativeHandle(peek_handle(&self.device))
    }

    fn native_context(&self) -> NativeHandle {
        NativeHandle(peek_handle(&self.context))
    }

    fn create_compute_shader(&mut self, bytecode: &[u8]) -> Result<ShaderHandle, DeviceError> {
        let mut shader: Option<ID3D11ComputeShader> = None;
        unsafe {
            self.device
                .CreateComputeShader(bytecode, None::<&ID3D11ClassLinkage>, Some(&mut shader))
        }
        .map_err(|e| DeviceError::with_detail("CreateComputeShader", e.to_string()))?;
        shader
            .map(|s| ShaderHandle(to_handle(s)))
            .ok_or_else(|| DeviceError::new("CreateComputeShader"))
    }

    fn create_constant_buffer(&mut self, byte_width: u32) -> Result<ResourceHandle, DeviceError> {
        let desc = D3D11_BUFFER_DESC {
            ByteWidth: byte_width,
            Usage: D3D11_USAGE_DYNAMIC,
            BindFlags: D3D11_BIND_CONSTANT_BUFFER.0 as u32,
            CPUAccessFlags: D3D11_CPU_ACCESS_WRITE.0 as u32,
            MiscFlags: 0,
            StructureByteStride: 0,
        };
        let mut buffer: Option<ID3D11Buffer> = None;
        unsafe { self.device.CreateBuffer(&desc, None, Some(&mut buffer)) }
            .map_err(|e| DeviceError::with_detail("CreateBuffer", e.to_string()))?;
        buffer
            .map(|b| ResourceHandle(to_handle(b)))
            .ok_or_else(|| DeviceError::new("CreateBuffer"))
    }

    fn create_texture_2d(&mut self, desc: &TextureDesc) -> Result<ResourceHandle, DeviceError> {
        let mut bind_flags = D3D11_BIND_SHADER_RESOURCE.0 as u32;
        if desc.unordered_access {
            bind_flags |= D3D11_BIND_UNORDERED_ACCESS.0 as u32;
        }
        let native = D3D11_TEXTURE2D_DESC {
            Width: desc.dimensions.width,
            Height: desc.dimensions.height,
            MipLevels: 1,
            ArraySize: 1,
            Format: dxgi_format(desc.format),
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: bind_flags,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };
        let mut texture: Option<ID3D11Texture2D> = None;
        unsafe { self.device.CreateTexture2D(&native, None, Some(&mut texture)) }
            .map_err(|e| DeviceError::with_detail("CreateTexture2D", e.to_string()))?;
        texture
            .map(|t| ResourceHandle(to_handle(t)))
            .ok_or_else(|| DeviceError::new("CreateTexture2D"))
    }

    fn create_unordered_access_view(
        &mut self,
        texture: ResourceHandle,
        format: TextureFormat,
    ) -> Result<ViewHandle, DeviceError> {
        // SAFETY: texture handles come from create_texture_2d.
        let resource = unsafe { borrow::<ID3D11Resource>(texture.0) }
            .ok_or_else(|| DeviceError::with_detail("CreateUnorderedAccessView", "null texture"))?;
        let desc = D3D11_UNORDERED_ACCESS_VIEW_DESC {
            Format: dxgi_format(format),
            ViewDimension: D3D11_UAV_DIMENSION_TEXTURE2D,
            Anonymous: D3D11_UNORDERED_ACCESS_VIEW_DESC_0 {
                Texture2D: D3D11_TEX2D_UAV { MipSlice: 0 },
            },
        };
        let mut uav: Option<ID3D11UnorderedAccessView> = None;
        unsafe {
            self.device
                .CreateUnorderedAccessView(&resource, Some(&desc), Some(&mut uav))
        }
        .map_err(|e| DeviceError::with_detail("CreateUnorderedAccessView", e.to_string()))?;
        uav.map(|v| ViewHandle(to_handle(v)))
            .ok_or_else(|| DeviceError::new("CreateUnorderedAccessView"))
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) {
        // SAFETY: shader handles are only produced by create_compute_shader.
        unsafe { release::<ID3D11ComputeShader>(shader.0) }
    }

    fn destroy_resource(&mut self, resource: ResourceHandle) {
        // SAFETY: only called for buffers and textures created above.
        unsafe { release::<ID3D11Resource>(resource.0) }
    }

    fn destroy_view(&mut self, view: ViewHandle) {
        // SAFETY: only called for views created above.
        unsafe { release::<ID3D11View>(view.0) }
    }

    fn buffer_byte_width(&self, resource: ResourceHandle) -> Option<u32> {
        // SAFETY: resource handles passed in by the host are live for the call.
        let resource = unsafe { borrow::<ID3D11Resource>(resource.0) }?;
        let mut dimension = D3D11_RESOURCE_DIMENSION_UNKNOWN;
        unsafe { resource.GetType(&mut dimension) };
        if dimension != D3D11_RESOURCE_DIMENSION_BUFFER {
            return None;
        }
        let buffer: ID3D11Buffer = resource.cast().ok()?;
        let mut desc = D3D11_BUFFER_DESC::default();
        unsafe { buffer.GetDesc(&mut desc) };
        Some(desc.ByteWidth)
    }

    fn bound_pixel_shader(&self) -> Option<PipelineHandle> {
        let mut shader: Option<ID3D11PixelShader> = None;
        unsafe { self.context.PSGetShader(&mut shader, None, None) };
        shader.map(|s| PipelineHandle(peek_handle(&s)))
    }

    fn bound_render_target(&self) -> Option<RenderTarget> {
        let mut views: [Option<ID3D11RenderTargetView>; 1] = [None];
        unsafe { self.context.OMGetRenderTargets(Some(&mut views), None) };
        let [Some(view)] = views else {
            return None;
        };
        let resource = unsafe { view.GetResource() }.ok()?;
        let dimensions = Self::texture_dimensions(&resource)?;
        Some(RenderTarget {
            resource: ResourceHandle(peek_handle(&resource)),
            dimensions,
        })
    }

    fn ps_constant_buffer(&self, slot: u32) -> Option<ResourceHandle> {
        let mut buffers: [Option<ID3D11Buffer>; 1] = [None];
        unsafe { self.context.PSGetConstantBuffers(slot, Some(&mut buffers)) };
        let [buffer] = buffers;
        buffer.map(|b| ResourceHandle(peek_handle(&b)))
    }

    fn ps_shader_resource(&self, slot: u32) -> Option<BoundView> {
        let mut views: [Option<ID3D11ShaderResourceView>; 1] = [None];
        unsafe { self.context.PSGetShaderResources(slot, Some(&mut views)) };
        let [Some(view)] = views else {
            return None;
        };
        let resource = Self::resource_of(&view.cast().ok()?)?;
        Some(BoundView {
            view: ViewHandle(peek_handle(&view)),
            resource,
        })
    }

    fn set_ps_constant_buffer(&mut self, slot: u32, buffer: Option<ResourceHandle>) {
        // SAFETY: buffer handles come from create_constant_buffer or the host.
        let buffer = buffer.and_then(|b| unsafe { borrow::<ID3D11Buffer>(b.0) });
        unsafe { self.context.PSSetConstantBuffers(slot, Some(&[buffer])) };
    }

    fn write_buffer(&mut self, buffer: ResourceHandle, data: &[u8]) -> Result<(), DeviceError> {
        // SAFETY: buffer handles come from create_constant_buffer.
        let resource = unsafe { borrow::<ID3D11Resource>(buffer.0) }
            .ok_or_else(|| DeviceError::with_detail("Map", "null buffer"))?;
        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe {
            self.context
                .Map(&resource, 0, D3D11_MAP_WRITE_DISCARD, 0, Some(&mut mapped))
        }
        .map_err(|e| DeviceError::with_detail("Map", e.to_string()))?;
        if mapped.pData.is_null() {
            unsafe { self.context.Unmap(&resource, 0) };
            return Err(DeviceError::with_detail("Map", "null mapping"));
        }
        // SAFETY: the mapping covers the whole buffer, which callers size for `data`.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.pData.cast::<u8>(), data.len());
            self.context.Unmap(&resource, 0);
        }
        Ok(())
    }

    fn set_compute_shader(&mut self, shader: Option<ShaderHandle>) {
        // SAFETY: shader handles come from create_compute_shader.
        let shader = shader.and_then(|s| unsafe { borrow::<ID3D11ComputeShader>(s.0) });
        unsafe { self.context.CSSetShader(shader.as_ref(), None) };
    }

    fn set_cs_shader_resources(&mut self, start_slot: u32, views: &[Option<ViewHandle>]) {
        // SAFETY: view handles are host views bound for the current draw.
        let views: Vec<Option<ID3D11ShaderResourceView>> = views
            .iter()
            .map(|v| v.and_then(|v| unsafe { borrow(v.0) }))
            .collect();
        unsafe { self.context.CSSetShaderResources(start_slot, Some(&views)) };
    }

    fn set_cs_constant_buffers(&mut self, start_slot: u32, buffers: &[Option<ResourceHandle>]) {
        // SAFETY: buffer handles are host buffers bound for the current draw.
        let buffers: Vec<Option<ID3D11Buffer>> = buffers
            .iter()
            .map(|b| b.and_then(|b| unsafe { borrow(b.0) }))
            .collect();
        unsafe { self.context.CSSetConstantBuffers(start_slot, Some(&buffers)) };
    }

    fn set_cs_unordered_access_views(&mut self, start_slot: u32, views: &[Option<ViewHandle>]) {
        // SAFETY: UAV handles come from create_unordered_access_view.
        let views: Vec<Option<ID3D11UnorderedAccessView>> = views
            .iter()
            .map(|v| v.and_then(|v| unsafe { borrow(v.0) }))
            .collect();
        let Ok(count) = u32::try_from(views.len()) else {
            warn!("Too many UAVs to bind: {}", views.len());
            return;
        };
        unsafe {
            self.context
                .CSSetUnorderedAccessViews(start_slot, count, Some(views.as_ptr()), None)
        };
    }

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        unsafe { self.context.Dispatch(groups_x, groups_y, groups_z) };
    }
}
