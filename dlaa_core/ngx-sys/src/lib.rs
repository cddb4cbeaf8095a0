//! Minimal NGX FFI layer for the D3D11 entry points of the DLSS SDK.
//! Links against nvsdk_ngx_d.lib (see build.rs).
//!
//! Declarations and constants are copied from `nvsdk_ngx.h`,
//! `nvsdk_ngx_defs.h` and `nvsdk_ngx_params.h` of the DLSS 310.x SDK, the
//! first line to carry render presets K and M. Recheck
//! `NVSDK_NGX_Version_API` and the preset hint keys against the headers when
//! moving `NVIDIA_NGX_SDK_PATH` to another SDK release.
#![allow(non_camel_case_types, non_snake_case)]

use std::os::raw::{c_char, c_int, c_uint, c_ulonglong, c_void};

/// Result codes returned by NGX functions.
pub type NVSDK_NGX_Result = c_uint;

pub const NVSDK_NGX_Result_Success: NVSDK_NGX_Result = 0x1;
pub const NVSDK_NGX_Result_Fail: NVSDK_NGX_Result = 0xBAD00000;
pub const NVSDK_NGX_Result_FAIL_FeatureNotSupported: NVSDK_NGX_Result = 0xBAD00001;
pub const NVSDK_NGX_Result_FAIL_OutOfDate: NVSDK_NGX_Result = 0xBAD0000B;
pub const NVSDK_NGX_Result_FAIL_InvalidParameter: NVSDK_NGX_Result = 0xBAD0000F;

pub type NVSDK_NGX_Version = c_uint;
/// `NVSDK_NGX_Version_API` of the 310.x headers.
pub const NVSDK_NGX_Version_API: NVSDK_NGX_Version = 0x0000015;

pub type NVSDK_NGX_Feature = c_int;
pub const NVSDK_NGX_Feature_SuperSampling: NVSDK_NGX_Feature = 1;

pub type NVSDK_NGX_PerfQuality_Value = c_int;
pub const NVSDK_NGX_PerfQuality_Value_MaxPerf: NVSDK_NGX_PerfQuality_Value = 0;
pub const NVSDK_NGX_PerfQuality_Value_Balanced: NVSDK_NGX_PerfQuality_Value = 1;
pub const NVSDK_NGX_PerfQuality_Value_MaxQuality: NVSDK_NGX_PerfQuality_Value = 2;
pub const NVSDK_NGX_PerfQuality_Value_UltraPerformance: NVSDK_NGX_PerfQuality_Value = 3;
pub const NVSDK_NGX_PerfQuality_Value_UltraQuality: NVSDK_NGX_PerfQuality_Value = 4;
pub const NVSDK_NGX_PerfQuality_Value_DLAA: NVSDK_NGX_PerfQuality_Value = 5;

pub const NVSDK_NGX_DLSS_Feature_Flags_IsHDR: c_int = 1 << 0;

/// Opaque parameter block.
#[repr(C)]
pub struct NVSDK_NGX_Parameter {
    _private: [u8; 0],
}

/// Opaque feature instance.
#[repr(C)]
pub struct NVSDK_NGX_Handle {
    _private: [u8; 0],
}

/// Optional progress callback for `NVSDK_NGX_D3D11_EvaluateFeature_C`.
pub type PFN_NVSDK_NGX_ProgressCallback_C =
    Option<unsafe extern "C" fn(progress: f32, should_cancel: *mut bool)>;

// --- Parameter keys (nvsdk_ngx_defs.h) ---

pub const NVSDK_NGX_Parameter_SuperSampling_Available: &[u8] = b"SuperSampling.Available\0";
pub const NVSDK_NGX_Parameter_SuperSampling_NeedsUpdatedDriver: &[u8] =
    b"SuperSampling.NeedsUpdatedDriver\0";
pub const NVSDK_NGX_Parameter_SuperSampling_FeatureInitResult: &[u8] =
    b"SuperSampling.FeatureInitResult\0";

pub const NVSDK_NGX_Parameter_Width: &[u8] = b"Width\0";
pub const NVSDK_NGX_Parameter_Height: &[u8] = b"Height\0";
pub const NVSDK_NGX_Parameter_OutWidth: &[u8] = b"OutWidth\0";
pub const NVSDK_NGX_Parameter_OutHeight: &[u8] = b"OutHeight\0";
pub const NVSDK_NGX_Parameter_PerfQualityValue: &[u8] = b"PerfQualityValue\0";
pub const NVSDK_NGX_Parameter_DLSS_Feature_Create_Flags: &[u8] = b"DLSS.Feature.Create.Flags\0";
pub const NVSDK_NGX_Parameter_DLSS_Enable_Output_Subrects: &[u8] =
    b"DLSS.Enable.Output.Subrects\0";
pub const NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_DLAA: &[u8] =
    b"DLSS.Hint.Render.Preset.DLAA\0";
pub const NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_Quality: &[u8] =
    b"DLSS.Hint.Render.Preset.Quality\0";
pub const NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_Balanced: &[u8] =
    b"DLSS.Hint.Render.Preset.Balanced\0";
pub const NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_Performance: &[u8] =
    b"DLSS.Hint.Render.Preset.Performance\0";
pub const NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_UltraPerformance: &[u8] =
    b"DLSS.Hint.Render.Preset.UltraPerformance\0";

pub const NVSDK_NGX_Parameter_Color: &[u8] = b"Color\0";
pub const NVSDK_NGX_Parameter_Output: &[u8] = b"Output\0";
pub const NVSDK_NGX_Parameter_Depth: &[u8] = b"Depth\0";
pub const NVSDK_NGX_Parameter_MotionVectors: &[u8] = b"MotionVectors\0";
pub const NVSDK_NGX_Parameter_Jitter_Offset_X: &[u8] = b"Jitter.Offset.X\0";
pub const NVSDK_NGX_Parameter_Jitter_Offset_Y: &[u8] = b"Jitter.Offset.Y\0";
pub const NVSDK_NGX_Parameter_Reset: &[u8] = b"Reset\0";
pub const NVSDK_NGX_Parameter_MV_Scale_X: &[u8] = b"MV.Scale.X\0";
pub const NVSDK_NGX_Parameter_MV_Scale_Y: &[u8] = b"MV.Scale.Y\0";
pub const NVSDK_NGX_Parameter_DLSS_Render_Subrect_Dimensions_Width: &[u8] =
    b"DLSS.Render.Subrect.Dimensions.Width\0";
pub const NVSDK_NGX_Parameter_DLSS_Render_Subrect_Dimensions_Height: &[u8] =
    b"DLSS.Render.Subrect.Dimensions.Height\0";

/// Borrow a NUL-terminated key constant as a C string pointer.
pub fn key(name: &'static [u8]) -> *const c_char {
    debug_assert_eq!(name.last(), Some(&0));
    name.as_ptr().cast()
}

extern "C" {
    // --- nvsdk_ngx.h (D3D11) ---

    /// Initialize NGX for a D3D11 device. Call once per device.
    pub fn NVSDK_NGX_D3D11_Init(
        in_application_id: c_ulonglong,
        in_application_data_path: *const u16,
        in_device: *mut c_void,
        in_feature_info: *const c_void,
        in_sdk_version: NVSDK_NGX_Version,
    ) -> NVSDK_NGX_Result;

    pub fn NVSDK_NGX_D3D11_Shutdown1(in_device: *mut c_void) -> NVSDK_NGX_Result;

    pub fn NVSDK_NGX_D3D11_GetCapabilityParameters(
        out_params: *mut *mut NVSDK_NGX_Parameter,
    ) -> NVSDK_NGX_Result;

    pub fn NVSDK_NGX_D3D11_AllocateParameters(
        out_params: *mut *mut NVSDK_NGX_Parameter,
    ) -> NVSDK_NGX_Result;

    pub fn NVSDK_NGX_D3D11_DestroyParameters(in_params: *mut NVSDK_NGX_Parameter)
        -> NVSDK_NGX_Result;

    /// - `in_dev_ctx`: the immediate `ID3D11DeviceContext*`.
    pub fn NVSDK_NGX_D3D11_CreateFeature(
        in_dev_ctx: *mut c_void,
        in_feature_id: NVSDK_NGX_Feature,
        in_parameters: *mut NVSDK_NGX_Parameter,
        out_handle: *mut *mut NVSDK_NGX_Handle,
    ) -> NVSDK_NGX_Result;

    pub fn NVSDK_NGX_D3D11_ReleaseFeature(in_handle: *mut NVSDK_NGX_Handle) -> NVSDK_NGX_Result;

    pub fn NVSDK_NGX_D3D11_EvaluateFeature_C(
        in_dev_ctx: *mut c_void,
        in_feature_handle: *const NVSDK_NGX_Handle,
        in_parameters: *const NVSDK_NGX_Parameter,
        in_callback: PFN_NVSDK_NGX_ProgressCallback_C,
    ) -> NVSDK_NGX_Result;

    // --- nvsdk_ngx_params.h ---

    pub fn NVSDK_NGX_Parameter_SetUI(
        in_parameter: *mut NVSDK_NGX_Parameter,
        in_name: *const c_char,
        in_value: c_uint,
    );
    pub fn NVSDK_NGX_Parameter_SetI(
        in_parameter: *mut NVSDK_NGX_Parameter,
        in_name: *const c_char,
        in_value: c_int,
    );
    pub fn NVSDK_NGX_Parameter_SetF(
        in_parameter: *mut NVSDK_NGX_Parameter,
        in_name: *const c_char,
        in_value: f32,
    );
    /// - `in_value`: an `ID3D11Resource*`.
    pub fn NVSDK_NGX_Parameter_SetD3d11Resource(
        in_parameter: *mut NVSDK_NGX_Parameter,
        in_name: *const c_char,
        in_value: *mut c_void,
    );
    pub fn NVSDK_NGX_Parameter_GetI(
        in_parameter: *mut NVSDK_NGX_Parameter,
        in_name: *const c_char,
        out_value: *mut c_int,
    ) -> NVSDK_NGX_Result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_match_310_headers() {
        assert_eq!(NVSDK_NGX_Version_API, 0x15);
        assert_eq!(NVSDK_NGX_PerfQuality_Value_DLAA, 5);
        assert_eq!(NVSDK_NGX_Result_FAIL_InvalidParameter & 0xFFF0_0000, NVSDK_NGX_Result_Fail);
    }

    #[test]
    fn parameter_keys_are_nul_terminated() {
        for name in [
            NVSDK_NGX_Parameter_Width,
            NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_UltraPerformance,
            NVSDK_NGX_Parameter_Jitter_Offset_Y,
        ] {
            assert_eq!(name.last(), Some(&0));
        }
    }
}
