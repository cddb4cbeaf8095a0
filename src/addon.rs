//! C entry points called by the add-on host's event dispatcher.
//!
//! Every entry point runs on the host's render thread. The device session
//! lives in one process-wide slot from `dlaa_init_device` until
//! `dlaa_destroy_device`; calls without a session are ignored.

use std::ffi::c_void;
use std::slice;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use dlaa_core::d3d11::D3d11Context;
use dlaa_core::device::NativeHandle;
use dlaa_core::ngx::NgxSdk;
use dlaa_core::{
    CreationRequestId, HookSession, MapAccess, PipelineHandle, PipelineSubobject, RenderPreset, ResourceHandle,
    ShaderCode, SubobjectKind,
};
use log::{error, info, warn};
use once_cell::sync::Lazy;

use crate::settings::{addon_dir, JsonConfigStore};
use crate::{logger, shaders};

struct Addon {
    session: HookSession<NgxSdk>,
    config: JsonConfigStore,
}

static ADDON: Lazy<Mutex<Option<Addon>>> = Lazy::new(|| Mutex::new(None));

fn addon() -> MutexGuard<'static, Option<Addon>> {
    // A panic on the render thread must not wedge every later frame
    ADDON.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One pipeline subobject as laid out by the host.
#[repr(C)]
pub struct DlaaSubobject {
    /// 0 vertex, 1 hull, 2 domain, 3 geometry, 4 pixel, 5 compute, other values ignored.
    pub kind: u32,
    pub code: *const u8,
    pub code_size: usize,
}

fn subobject_kind(kind: u32) -> SubobjectKind {
    match kind {
        0 => SubobjectKind::VertexShader,
        1 => SubobjectKind::HullShader,
        2 => SubobjectKind::DomainShader,
        3 => SubobjectKind::GeometryShader,
        4 => SubobjectKind::PixelShader,
        5 => SubobjectKind::ComputeShader,
        _ => SubobjectKind::Other,
    }
}

fn map_access(access: u32) -> Option<MapAccess> {
    match access {
        0 => Some(MapAccess::ReadOnly),
        1 => Some(MapAccess::WriteOnly),
        2 => Some(MapAccess::ReadWrite),
        3 => Some(MapAccess::WriteDiscard),
        _ => None,
    }
}

fn open_session(device: *mut c_void) -> Result<Addon> {
    let dir = addon_dir()?;
    if let Err(e) = logger::init_logger(Some(&dir), cfg!(debug_assertions)) {
        eprintln!("{}: {:#}", crate::ADDON_NAME, e);
    }

    let config = JsonConfigStore::open_default()?;
    let blobs = shaders::load_blobs(&dir.join("shaders"));
    // SAFETY: the host passes its live ID3D11Device*.
    let mut ctx = unsafe { D3d11Context::from_device(device) }.context("Device is not a D3D11 device")?;

    let session = HookSession::on_init_device(NgxSdk::new(), &mut ctx, &config, blobs);
    Ok(Addon { session, config })
}

/// # Safety
///
/// `device` must be a live `ID3D11Device*`.
#[no_mangle]
pub unsafe extern "C" fn dlaa_init_device(device: *mut c_void) -> bool {
    let mut slot = addon();
    if slot.is_some() {
        warn!("Ignoring second device; only one device session is supported");
        return false;
    }
    match open_session(device) {
        Ok(addon) => {
            *slot = Some(addon);
            true
        }
        Err(e) => {
            error!("Failed to start device session: {:#}", e);
            false
        }
    }
}

/// # Safety
///
/// `device` must be the device passed to [`dlaa_init_device`], still alive.
#[no_mangle]
pub unsafe extern "C" fn dlaa_destroy_device(device: *mut c_void) {
    let Some(addon) = addon().take() else {
        return;
    };
    // SAFETY: forwarded from this function's contract.
    match unsafe { D3d11Context::from_device(device) } {
        Some(mut ctx) => {
            addon.session.on_destroy_device(&mut ctx);
        }
        None => {
            addon.session.on_device_lost(NativeHandle(device as usize as u64));
        }
    }
    info!("Device session closed");
}

/// Inspect a pipeline-creation request. On `true`, shader code pointers in
/// `subobjects` were replaced and stay valid until the device is destroyed.
///
/// # Safety
///
/// `subobjects` must point to `count` valid entries whose code pointers
/// reference `code_size` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn dlaa_create_pipeline(request: u64, subobjects: *mut DlaaSubobject, count: u32) -> bool {
    let mut slot = addon();
    let Some(addon) = slot.as_mut() else {
        return false;
    };
    // An empty request still clears whatever was recorded under its id
    let raw: &mut [DlaaSubobject] = if subobjects.is_null() || count == 0 {
        &mut []
    } else {
        // SAFETY: forwarded from this function's contract.
        unsafe { slice::from_raw_parts_mut(subobjects, count as usize) }
    };
    let mut parsed: Vec<PipelineSubobject<'_>> = raw
        .iter()
        .map(|s| {
            let code = if s.code.is_null() {
                &[][..]
            } else {
                // SAFETY: forwarded from this function's contract.
                unsafe { slice::from_raw_parts(s.code, s.code_size) }
            };
            PipelineSubobject::new(subobject_kind(s.kind), code)
        })
        .collect();

    if !addon.session.on_create_pipeline(CreationRequestId(request), &mut parsed) {
        return false;
    }
    for (out, subobject) in raw.iter_mut().zip(&parsed) {
        if let ShaderCode::Replaced(code) = &subobject.code {
            // The session's blobs outlive every pipeline created on the device
            out.code = code.as_ptr();
            out.code_size = code.len();
        }
    }
    true
}

#[no_mangle]
pub extern "C" fn dlaa_init_pipeline(request: u64, pipeline: u64) {
    if let Some(addon) = addon().as_mut() {
        addon
            .session
            .on_init_pipeline(CreationRequestId(request), PipelineHandle(pipeline));
    }
}

#[no_mangle]
pub extern "C" fn dlaa_destroy_pipeline(pipeline: u64) {
    if let Some(addon) = addon().as_mut() {
        addon.session.on_destroy_pipeline(PipelineHandle(pipeline));
    }
}

/// Returns `true` when the draw was fully handled and must be skipped.
///
/// # Safety
///
/// `context` must be a live `ID3D11DeviceContext*`.
#[no_mangle]
pub unsafe extern "C" fn dlaa_draw(context: *mut c_void) -> bool {
    let mut slot = addon();
    let Some(addon) = slot.as_mut() else {
        return false;
    };
    // SAFETY: forwarded from this function's contract.
    let Some(mut ctx) = (unsafe { D3d11Context::from_context(context) }) else {
        return false;
    };
    addon.session.on_draw(&mut ctx)
}

/// # Safety
///
/// `device` must be a live `ID3D11Device*`, `resource` a live buffer, and
/// `data` its mapping, valid until [`dlaa_unmap_buffer_region`] for it.
#[no_mangle]
pub unsafe extern "C" fn dlaa_map_buffer_region(device: *mut c_void, resource: u64, access: u32, data: *mut c_void) {
    let mut slot = addon();
    let Some(addon) = slot.as_mut() else {
        return;
    };
    let Some(access) = map_access(access) else {
        return;
    };
    // SAFETY: forwarded from this function's contract.
    let Some(ctx) = (unsafe { D3d11Context::from_device(device) }) else {
        return;
    };
    // SAFETY: forwarded from this function's contract.
    unsafe {
        addon
            .session
            .on_map_buffer(&ctx, ResourceHandle(resource), access, data.cast())
    };
}

#[no_mangle]
pub extern "C" fn dlaa_unmap_buffer_region(resource: u64) {
    if let Some(addon) = addon().as_mut() {
        addon.session.on_unmap_buffer(ResourceHandle(resource));
    }
}

#[no_mangle]
pub extern "C" fn dlaa_present() {
    if let Some(addon) = addon().as_mut() {
        addon.session.on_present();
    }
}

/// Overlay slider; clamped to `[0, 2]` and persisted.
#[no_mangle]
pub extern "C" fn dlaa_set_sharpen_amount(amount: f32) {
    if let Some(addon) = addon().as_mut() {
        addon.session.set_sharpen_intensity(&mut addon.config, amount);
    }
}

/// Overlay preset selector taking the NGX hint value. Returns `false` for
/// unknown presets.
#[no_mangle]
pub extern "C" fn dlaa_set_preset(preset: u32) -> bool {
    let Some(preset) = RenderPreset::from_hint_value(i64::from(preset)) else {
        return false;
    };
    match addon().as_mut() {
        Some(addon) => {
            addon.session.set_preset(&mut addon.config, preset);
            true
        }
        None => false,
    }
}
