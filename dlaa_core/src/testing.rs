//! In-memory device, SDK and config store for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use crate::config::ConfigStore;
use crate::device::{
    BoundView, DeviceError, FrameDimensions, GraphicsContext, NativeHandle, PipelineHandle, RenderTarget,
    ResourceHandle, ShaderHandle, TextureDesc, TextureFormat, ViewHandle,
};
use crate::harvest::{COLOR_SRV_SLOT, DEPTH_SRV_SLOT, TAA_CB_SLOT, VELOCITY_SRV_SLOT};
use crate::sdk::{
    EvaluationParams, FeatureCreateInfo, FeatureHandle, ParameterHandle, SdkStatus, SuperSamplingCapability,
    UpscalerSdk,
};
use crate::shader::ShaderBlobs;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bytes whose CRC-32 is the host TAA shader's.
pub fn taa_host_bytecode() -> Vec<u8> {
    b"host taa ps\xE3\x75\x58\x10".to_vec()
}

/// Bytes whose CRC-32 is the host sharpen shader's.
pub fn sharpen_host_bytecode() -> Vec<u8> {
    b"host sharpen ps\x50\x5A\x76\x25".to_vec()
}

pub fn test_blobs() -> ShaderBlobs {
    ShaderBlobs {
        prepare_motion_vectors: Some(Arc::from(&b"prepare motion vectors cs"[..])),
        sharpen: Some(Arc::from(&b"replacement sharpen ps"[..])),
    }
}

/// Call names shared between a `MockContext` and a `MockSdk`, so tests can
/// check ordering across the device and the SDK.
pub type CallLog = Rc<RefCell<Vec<&'static str>>>;

fn log_call(log: &Option<CallLog>, call: &'static str) {
    if let Some(log) = log {
        log.borrow_mut().push(call);
    }
}

#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: HashMap<(String, String), String>,
}

impl ConfigStore for MemoryConfigStore {
    fn get_value(&self, section: &str, key: &str) -> Option<String> {
        self.values.get(&(section.to_owned(), key.to_owned())).cloned()
    }

    fn set_value(&mut self, section: &str, key: &str, value: &str) {
        self.values
            .insert((section.to_owned(), key.to_owned()), value.to_owned());
    }
}

/// Compute-stage and dispatch calls, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    SetComputeShader(Option<ShaderHandle>),
    SetCsShaderResources(u32, Vec<Option<ViewHandle>>),
    SetCsConstantBuffers(u32, Vec<Option<ResourceHandle>>),
    SetCsUnorderedAccessViews(u32, Vec<Option<ViewHandle>>),
    Dispatch(u32, u32, u32),
}

#[derive(Debug)]
enum MockObject {
    Shader,
    Buffer(Vec<u8>),
    Texture(TextureDesc),
    View,
}

/// Records every call; objects it creates are tracked until destroyed.
#[derive(Debug)]
pub struct MockContext {
    next_handle: u64,
    objects: HashMap<u64, MockObject>,
    host_buffers: HashMap<ResourceHandle, u32>,
    failing: HashSet<&'static str>,
    events: Vec<MockEvent>,
    call_log: Option<CallLog>,
    pixel_shader: Option<PipelineHandle>,
    render_target: Option<RenderTarget>,
    ps_constant_buffers: HashMap<u32, ResourceHandle>,
    ps_shader_resources: HashMap<u32, BoundView>,
}

impl Default for MockContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContext {
    pub fn new() -> Self {
        Self {
            // Clear of the small constants tests use for host objects
            next_handle: 0x10_0000,
            objects: HashMap::new(),
            host_buffers: HashMap::new(),
            failing: HashSet::new(),
            events: Vec::new(),
            call_log: None,
            pixel_shader: None,
            render_target: None,
            ps_constant_buffers: HashMap::new(),
            ps_shader_resources: HashMap::new(),
        }
    }

    /// Make every later call named `call` fail.
    pub fn fail_call(&mut self, call: &'static str) {
        self.failing.insert(call);
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    /// Append dispatches to `log` as well.
    pub fn share_call_log(&mut self, log: CallLog) {
        self.call_log = Some(log);
    }

    pub fn events(&self) -> &[MockEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn dispatches(&self) -> Vec<(u32, u32, u32)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Dispatch(x, y, z) => Some((*x, *y, *z)),
                _ => None,
            })
            .collect()
    }

    pub fn texture_desc(&self, texture: ResourceHandle) -> Option<TextureDesc> {
        match self.objects.get(&texture.0) {
            Some(MockObject::Texture(desc)) => Some(*desc),
            _ => None,
        }
    }

    pub fn byte_width_of(&self, buffer: ResourceHandle) -> Option<u32> {
        match self.objects.get(&buffer.0) {
            Some(MockObject::Buffer(data)) => u32::try_from(data.len()).ok(),
            _ => None,
        }
    }

    /// Contents of a buffer created through this context, as floats.
    pub fn buffer_floats(&self, buffer: ResourceHandle) -> Vec<f32> {
        match self.objects.get(&buffer.0) {
            Some(MockObject::Buffer(data)) => data
                .chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<f32>)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Declare a host-owned buffer of `byte_width`.
    pub fn register_buffer(&mut self, buffer: ResourceHandle, byte_width: u32) {
        self.host_buffers.insert(buffer, byte_width);
    }

    pub fn bind_pixel_shader(&mut self, shader: Option<PipelineHandle>) {
        self.pixel_shader = shader;
    }

    pub fn bind_render_target(&mut self, resource: Option<ResourceHandle>, dimensions: FrameDimensions) {
        self.render_target = resource.map(|resource| RenderTarget { resource, dimensions });
    }

    /// Bind the TAA pass's constant buffer and views at their slots.
    pub fn bind_taa_inputs(
        &mut self,
        constants: ResourceHandle,
        color: BoundView,
        depth: BoundView,
        velocity: BoundView,
    ) {
        self.ps_constant_buffers.insert(TAA_CB_SLOT, constants);
        self.ps_shader_resources.insert(COLOR_SRV_SLOT, color);
        self.ps_shader_resources.insert(DEPTH_SRV_SLOT, depth);
        self.ps_shader_resources.insert(VELOCITY_SRV_SLOT, velocity);
    }

    pub fn unbind_ps_shader_resource(&mut self, slot: u32) {
        self.ps_shader_resources.remove(&slot);
    }

    fn check(&self, call: &'static str) -> Result<(), DeviceError> {
        if self.failing.contains(call) {
            Err(DeviceError::with_detail(call, "E_FAIL"))
        } else {
            Ok(())
        }
    }

    fn insert(&mut self, object: MockObject) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 0x10;
        self.objects.insert(handle, object);
        handle
    }
}

impl GraphicsContext for MockContext {
    fn native_device(&self) -> NativeHandle {
        NativeHandle(0xD3D1_1000)
    }

    fn native_context(&self) -> NativeHandle {
        NativeHandle(0xD3D1_1C00)
    }

    fn create_compute_shader(&mut self, bytecode: &[u8]) -> Result<ShaderHandle, DeviceError> {
        self.check("CreateComputeShader")?;
        if bytecode.is_empty() {
            return Err(DeviceError::with_detail("CreateComputeShader", "E_INVALIDARG"));
        }
        Ok(ShaderHandle(self.insert(MockObject::Shader)))
    }

    fn create_constant_buffer(&mut self, byte_width: u32) -> Result<ResourceHandle, DeviceError> {
        self.check("CreateBuffer")?;
        Ok(ResourceHandle(self.insert(MockObject::Buffer(vec![0; byte_width as usize]))))
    }

    fn create_texture_2d(&mut self, desc: &TextureDesc) -> Result<ResourceHandle, DeviceError> {
        self.check("CreateTexture2D")?;
        Ok(ResourceHandle(self.insert(MockObject::Texture(*desc))))
    }

    fn create_unordered_access_view(
        &mut self,
        texture: ResourceHandle,
        format: TextureFormat,
    ) -> Result<ViewHandle, DeviceError> {
        self.check("CreateUnorderedAccessView")?;
        match self.texture_desc(texture) {
            Some(desc) if desc.unordered_access && desc.format == format => {
                Ok(ViewHandle(self.insert(MockObject::View)))
            }
            _ => Err(DeviceError::with_detail("CreateUnorderedAccessView", "E_INVALIDARG")),
        }
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) {
        assert!(matches!(self.objects.remove(&shader.0), Some(MockObject::Shader)));
    }

    fn destroy_resource(&mut self, resource: ResourceHandle) {
        assert!(matches!(
            self.objects.remove(&resource.0),
            Some(MockObject::Buffer(_) | MockObject::Texture(_))
        ));
    }

    fn destroy_view(&mut self, view: ViewHandle) {
        assert!(matches!(self.objects.remove(&view.0), Some(MockObject::View)));
    }

    fn buffer_byte_width(&self, resource: ResourceHandle) -> Option<u32> {
        self.byte_width_of(resource)
            .or_else(|| self.host_buffers.get(&resource).copied())
    }

    fn bound_pixel_shader(&self) -> Option<PipelineHandle> {
        self.pixel_shader
    }

    fn bound_render_target(&self) -> Option<RenderTarget> {
        self.render_target
    }

    fn ps_constant_buffer(&self, slot: u32) -> Option<ResourceHandle> {
        self.ps_constant_buffers.get(&slot).copied()
    }

    fn ps_shader_resource(&self, slot: u32) -> Option<BoundView> {
        self.ps_shader_resources.get(&slot).copied()
    }

    fn set_ps_constant_buffer(&mut self, slot: u32, buffer: Option<ResourceHandle>) {
        match buffer {
            Some(buffer) => self.ps_constant_buffers.insert(slot, buffer),
            None => self.ps_constant_buffers.remove(&slot),
        };
    }

    fn write_buffer(&mut self, buffer: ResourceHandle, data: &[u8]) -> Result<(), DeviceError> {
        self.check("Map")?;
        match self.objects.get_mut(&buffer.0) {
            Some(MockObject::Buffer(contents)) if data.len() <= contents.len() => {
                contents[..data.len()].copy_from_slice(data);
                Ok(())
            }
            _ => Err(DeviceError::with_detail("Map", "E_INVALIDARG")),
        }
    }

    fn set_compute_shader(&mut self, shader: Option<ShaderHandle>) {
        self.events.push(MockEvent::SetComputeShader(shader));
    }

    fn set_cs_shader_resources(&mut self, start_slot: u32, views: &[Option<ViewHandle>]) {
        self.events
            .push(MockEvent::SetCsShaderResources(start_slot, views.to_vec()));
    }

    fn set_cs_constant_buffers(&mut self, start_slot: u32, buffers: &[Option<ResourceHandle>]) {
        self.events
            .push(MockEvent::SetCsConstantBuffers(start_slot, buffers.to_vec()));
    }

    fn set_cs_unordered_access_views(&mut self, start_slot: u32, views: &[Option<ViewHandle>]) {
        self.events
            .push(MockEvent::SetCsUnorderedAccessViews(start_slot, views.to_vec()));
    }

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        log_call(&self.call_log, "Dispatch");
        self.events.push(MockEvent::Dispatch(groups_x, groups_y, groups_z));
    }
}

/// Scriptable SDK that tracks live parameter blocks and features.
#[derive(Debug)]
pub struct MockSdk {
    pub capability: SuperSamplingCapability,
    pub init_status: SdkStatus,
    pub create_status: SdkStatus,
    pub evaluate_status: SdkStatus,
    /// Successful creations, in order.
    pub created: Vec<FeatureCreateInfo>,
    pub released: Vec<FeatureHandle>,
    pub create_calls: usize,
    pub evaluations: Vec<(FeatureHandle, EvaluationParams)>,
    pub shutdown_calls: usize,
    /// Receives feature creations and evaluations when set.
    pub call_log: Option<CallLog>,
    next_handle: u64,
    parameters: HashSet<ParameterHandle>,
    features: HashSet<FeatureHandle>,
}

impl Default for MockSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSdk {
    pub fn new() -> Self {
        Self {
            capability: SuperSamplingCapability {
                needs_updated_driver: false,
                available: true,
                feature_init_result: true,
            },
            init_status: SdkStatus::SUCCESS,
            create_status: SdkStatus::SUCCESS,
            evaluate_status: SdkStatus::SUCCESS,
            created: Vec::new(),
            released: Vec::new(),
            create_calls: 0,
            evaluations: Vec::new(),
            shutdown_calls: 0,
            call_log: None,
            next_handle: 1,
            parameters: HashSet::new(),
            features: HashSet::new(),
        }
    }

    pub fn live_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn live_features(&self) -> usize {
        self.features.len()
    }

    fn next(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl UpscalerSdk for MockSdk {
    fn initialize(&mut self, _device: NativeHandle) -> Result<(), SdkStatus> {
        self.init_status.into_result()
    }

    fn capability_parameters(&mut self) -> Result<ParameterHandle, SdkStatus> {
        self.allocate_parameters()
    }

    fn super_sampling_capability(
        &mut self,
        capabilities: ParameterHandle,
    ) -> Result<SuperSamplingCapability, SdkStatus> {
        if !self.parameters.contains(&capabilities) {
            return Err(SdkStatus::INVALID_PARAMETER);
        }
        Ok(self.capability)
    }

    fn allocate_parameters(&mut self) -> Result<ParameterHandle, SdkStatus> {
        let handle = ParameterHandle(self.next());
        self.parameters.insert(handle);
        Ok(handle)
    }

    fn destroy_parameters(&mut self, parameters: ParameterHandle) {
        assert!(self.parameters.remove(&parameters), "double destroy of {:?}", parameters);
    }

    fn create_feature(
        &mut self,
        _context: NativeHandle,
        parameters: ParameterHandle,
        info: &FeatureCreateInfo,
    ) -> Result<FeatureHandle, SdkStatus> {
        self.create_calls += 1;
        if !self.parameters.contains(&parameters) {
            return Err(SdkStatus::INVALID_PARAMETER);
        }
        self.create_status.into_result()?;
        let handle = FeatureHandle(self.next());
        self.features.insert(handle);
        self.created.push(*info);
        log_call(&self.call_log, "CreateFeature");
        Ok(handle)
    }

    fn release_feature(&mut self, feature: FeatureHandle) {
        assert!(self.features.remove(&feature), "double release of {:?}", feature);
        self.released.push(feature);
    }

    fn evaluate(
        &mut self,
        _context: NativeHandle,
        feature: FeatureHandle,
        parameters: ParameterHandle,
        params: &EvaluationParams,
    ) -> Result<(), SdkStatus> {
        assert!(self.features.contains(&feature));
        assert!(self.parameters.contains(&parameters));
        self.evaluations.push((feature, *params));
        log_call(&self.call_log, "EvaluateFeature");
        self.evaluate_status.into_result()
    }

    fn shutdown(&mut self, _device: NativeHandle) {
        self.shutdown_calls += 1;
    }
}
