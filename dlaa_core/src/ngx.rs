//! `UpscalerSdk` backed by the NGX D3D11 entry points.

use std::ffi::c_void;
use std::ptr;

use log::{debug, warn};
use ngx_sys::*;

use crate::device::{NativeHandle, ResourceHandle};
use crate::sdk::{
    EvaluationParams, FeatureCreateInfo, FeatureHandle, ParameterHandle, PerfQuality, SdkStatus,
    SuperSamplingCapability, UpscalerSdk,
};

/// Application id passed to `NVSDK_NGX_D3D11_Init`; NGX only needs a
/// non-zero value for unregistered applications.
const APPLICATION_ID: u64 = 1;
/// Empty wide string: NGX writes its logs next to the executable.
static APPLICATION_DATA_PATH: [u16; 1] = [0];

const PRESET_HINT_KEYS: [&[u8]; 5] = [
    NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_DLAA,
    NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_Quality,
    NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_Balanced,
    NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_Performance,
    NVSDK_NGX_Parameter_DLSS_Hint_Render_Preset_UltraPerformance,
];

fn status(result: NVSDK_NGX_Result) -> Result<(), SdkStatus> {
    SdkStatus(result).into_result()
}

fn native(handle: NativeHandle) -> *mut c_void {
    handle.raw() as usize as *mut c_void
}

fn parameter_ptr(handle: ParameterHandle) -> *mut NVSDK_NGX_Parameter {
    handle.0 as usize as *mut NVSDK_NGX_Parameter
}

fn feature_ptr(handle: FeatureHandle) -> *mut NVSDK_NGX_Handle {
    handle.0 as usize as *mut NVSDK_NGX_Handle
}

fn perf_quality(quality: PerfQuality) -> NVSDK_NGX_PerfQuality_Value {
    match quality {
        PerfQuality::MaxPerformance => NVSDK_NGX_PerfQuality_Value_MaxPerf,
        PerfQuality::Balanced => NVSDK_NGX_PerfQuality_Value_Balanced,
        PerfQuality::MaxQuality => NVSDK_NGX_PerfQuality_Value_MaxQuality,
        PerfQuality::UltraPerformance => NVSDK_NGX_PerfQuality_Value_UltraPerformance,
        PerfQuality::UltraQuality => NVSDK_NGX_PerfQuality_Value_UltraQuality,
        PerfQuality::Dlaa => NVSDK_NGX_PerfQuality_Value_DLAA,
    }
}

/// Read an integer capability flag as a bool.
///
/// # Safety
///
/// `params` must be a live parameter block.
unsafe fn get_flag(params: *mut NVSDK_NGX_Parameter, name: &'static [u8]) -> Result<bool, SdkStatus> {
    let mut value = 0;
    // SAFETY: forwarded from this function's contract; `name` is NUL-terminated.
    status(unsafe { NVSDK_NGX_Parameter_GetI(params, key(name), &mut value) })?;
    Ok(value != 0)
}

/// Process-wide NGX for one D3D11 device at a time.
#[derive(Debug, Default)]
pub struct NgxSdk {
    _private: (),
}

impl NgxSdk {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpscalerSdk for NgxSdk {
    fn initialize(&mut self, device: NativeHandle) -> Result<(), SdkStatus> {
        // SAFETY: `device` is the host's live ID3D11Device*.
        status(unsafe {
            NVSDK_NGX_D3D11_Init(
                APPLICATION_ID,
                APPLICATION_DATA_PATH.as_ptr(),
                native(device),
                ptr::null(),
                NVSDK_NGX_Version_API,
            )
        })
    }

    fn capability_parameters(&mut self) -> Result<ParameterHandle, SdkStatus> {
        let mut params = ptr::null_mut();
        // SAFETY: NGX writes one pointer to `params`.
        status(unsafe { NVSDK_NGX_D3D11_GetCapabilityParameters(&mut params) })?;
        if params.is_null() {
            return Err(SdkStatus::FAIL);
        }
        Ok(ParameterHandle(params as usize as u64))
    }

    fn super_sampling_capability(
        &mut self,
        capabilities: ParameterHandle,
    ) -> Result<SuperSamplingCapability, SdkStatus> {
        let params = parameter_ptr(capabilities);
        // SAFETY: `capabilities` came from capability_parameters.
        unsafe {
            Ok(SuperSamplingCapability {
                needs_updated_driver: get_flag(params, NVSDK_NGX_Parameter_SuperSampling_NeedsUpdatedDriver)?,
                available: get_flag(params, NVSDK_NGX_Parameter_SuperSampling_Available)?,
                feature_init_result: get_flag(params, NVSDK_NGX_Parameter_SuperSampling_FeatureInitResult)?,
            })
        }
    }

    fn allocate_parameters(&mut self) -> Result<ParameterHandle, SdkStatus> {
        let mut params = ptr::null_mut();
        // SAFETY: NGX writes one pointer to `params`.
        status(unsafe { NVSDK_NGX_D3D11_AllocateParameters(&mut params) })?;
        if params.is_null() {
            return Err(SdkStatus::FAIL);
        }
        Ok(ParameterHandle(params as usize as u64))
    }

    fn destroy_parameters(&mut self, parameters: ParameterHandle) {
        // SAFETY: handle came from allocate_parameters or capability_parameters.
        let result = unsafe { NVSDK_NGX_D3D11_DestroyParameters(parameter_ptr(parameters)) };
        if let Err(code) = status(result) {
            warn!("NVSDK_NGX_D3D11_DestroyParameters failed: {}", code);
        }
    }

    fn create_feature(
        &mut self,
        context: NativeHandle,
        parameters: ParameterHandle,
        info: &FeatureCreateInfo,
    ) -> Result<FeatureHandle, SdkStatus> {
        let params = parameter_ptr(parameters);
        let flags = if info.hdr { NVSDK_NGX_DLSS_Feature_Flags_IsHDR } else { 0 };

        // SAFETY: `params` is a live block from allocate_parameters and every key is NUL-terminated.
        unsafe {
            NVSDK_NGX_Parameter_SetUI(params, key(NVSDK_NGX_Parameter_Width), info.render.width);
            NVSDK_NGX_Parameter_SetUI(params, key(NVSDK_NGX_Parameter_Height), info.render.height);
            NVSDK_NGX_Parameter_SetUI(params, key(NVSDK_NGX_Parameter_OutWidth), info.output.width);
            NVSDK_NGX_Parameter_SetUI(params, key(NVSDK_NGX_Parameter_OutHeight), info.output.height);
            NVSDK_NGX_Parameter_SetI(params, key(NVSDK_NGX_Parameter_PerfQualityValue), perf_quality(info.quality));
            NVSDK_NGX_Parameter_SetI(params, key(NVSDK_NGX_Parameter_DLSS_Feature_Create_Flags), flags);
            NVSDK_NGX_Parameter_SetI(
                params,
                key(NVSDK_NGX_Parameter_DLSS_Enable_Output_Subrects),
                i32::from(info.output_subrects),
            );
            for hint in PRESET_HINT_KEYS {
                NVSDK_NGX_Parameter_SetUI(params, key(hint), info.preset.hint_value());
            }
        }

        let mut handle = ptr::null_mut();
        // SAFETY: `context` is the host's immediate context; NGX writes one handle.
        status(unsafe {
            NVSDK_NGX_D3D11_CreateFeature(native(context), NVSDK_NGX_Feature_SuperSampling, params, &mut handle)
        })?;
        if handle.is_null() {
            return Err(SdkStatus::FAIL);
        }
        debug!("NGX feature {:p} created at {}", handle, info.render);
        Ok(FeatureHandle(handle as usize as u64))
    }

    fn release_feature(&mut self, feature: FeatureHandle) {
        // SAFETY: handle came from create_feature and is released once.
        let result = unsafe { NVSDK_NGX_D3D11_ReleaseFeature(feature_ptr(feature)) };
        if let Err(code) = status(result) {
            warn!("NVSDK_NGX_D3D11_ReleaseFeature failed: {}", code);
        }
    }

    fn evaluate(
        &mut self,
        context: NativeHandle,
        feature: FeatureHandle,
        parameters: ParameterHandle,
        params: &EvaluationParams,
    ) -> Result<(), SdkStatus> {
        let block = parameter_ptr(parameters);
        let resource = |handle: ResourceHandle| handle.raw() as usize as *mut c_void;

        // SAFETY: `block` is the feature's live parameter block; resources are
        // the host's live ID3D11Resource pointers for this draw.
        unsafe {
            NVSDK_NGX_Parameter_SetD3d11Resource(block, key(NVSDK_NGX_Parameter_Color), resource(params.color));
            NVSDK_NGX_Parameter_SetD3d11Resource(block, key(NVSDK_NGX_Parameter_Output), resource(params.output));
            NVSDK_NGX_Parameter_SetD3d11Resource(block, key(NVSDK_NGX_Parameter_Depth), resource(params.depth));
            NVSDK_NGX_Parameter_SetD3d11Resource(
                block,
                key(NVSDK_NGX_Parameter_MotionVectors),
                resource(params.motion_vectors),
            );
            NVSDK_NGX_Parameter_SetF(block, key(NVSDK_NGX_Parameter_Jitter_Offset_X), params.jitter_offset[0]);
            NVSDK_NGX_Parameter_SetF(block, key(NVSDK_NGX_Parameter_Jitter_Offset_Y), params.jitter_offset[1]);
            NVSDK_NGX_Parameter_SetI(block, key(NVSDK_NGX_Parameter_Reset), i32::from(params.reset));
            NVSDK_NGX_Parameter_SetF(block, key(NVSDK_NGX_Parameter_MV_Scale_X), params.mv_scale[0]);
            NVSDK_NGX_Parameter_SetF(block, key(NVSDK_NGX_Parameter_MV_Scale_Y), params.mv_scale[1]);
            NVSDK_NGX_Parameter_SetUI(
                block,
                key(NVSDK_NGX_Parameter_DLSS_Render_Subrect_Dimensions_Width),
                params.render_subrect.width,
            );
            NVSDK_NGX_Parameter_SetUI(
                block,
                key(NVSDK_NGX_Parameter_DLSS_Render_Subrect_Dimensions_Height),
                params.render_subrect.height,
            );
        }

        // SAFETY: feature and parameters are live; no progress callback.
        status(unsafe { NVSDK_NGX_D3D11_EvaluateFeature_C(native(context), feature_ptr(feature), block, None) })
    }

    fn shutdown(&mut self, device: NativeHandle) {
        // SAFETY: `device` is the device NGX was initialized with.
        let result = unsafe { NVSDK_NGX_D3D11_Shutdown1(native(device)) };
        if let Err(code) = status(result) {
            warn!("NVSDK_NGX_D3D11_Shutdown1 failed: {}", code);
        }
    }
}
