//! FFXV DLAA add-on: hooks the host's D3D11 renderer, runs NVIDIA DLAA in
//! place of its TAA pass and feeds a tunable intensity to its sharpen pass.

use std::ffi::c_char;

pub mod logger;
pub mod settings;
pub mod shaders;

#[cfg(all(windows, feature = "native"))]
pub mod addon;

pub const ADDON_NAME: &str = "FFXV DLAA";

/// A C string pointer exported as a data symbol.
#[repr(transparent)]
pub struct ExportedStr(*const c_char);

// SAFETY: points at immutable 'static data.
unsafe impl Sync for ExportedStr {}

impl ExportedStr {
    pub fn as_ptr(&self) -> *const c_char {
        self.0
    }
}

/// Add-on name read by the host loader.
#[no_mangle]
pub static NAME: ExportedStr = ExportedStr(c"FFXV DLAA".as_ptr());

/// Add-on description read by the host loader.
#[no_mangle]
pub static DESCRIPTION: ExportedStr =
    ExportedStr(c"Replaces FFXV's TAA with NVIDIA DLAA and adds adjustable sharpening.".as_ptr());
