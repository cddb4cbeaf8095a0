//! Recognizes the host's TAA and sharpen pixel shaders by bytecode checksum.

pub mod registry;

use std::sync::Arc;

use log::{debug, info};

pub use registry::{CreationRequestId, PipelineRegistry};

/// CRC-32 of a shader's bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderFingerprint(pub u32);

impl std::fmt::Display for ShaderFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010X}", self.0)
    }
}

/// The host's native TAA resolve pixel shader.
pub const TAA_FINGERPRINT: ShaderFingerprint = ShaderFingerprint(0x0DF0_A97D);
/// The host's sharpen pixel shader, swapped for the embedded variant.
pub const SHARPEN_FINGERPRINT: ShaderFingerprint = ShaderFingerprint(0x0D1C_D1AA);

/// Role of a recognized pixel shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderRole {
    Taa,
    Sharpen,
}

pub fn fingerprint(bytecode: &[u8]) -> ShaderFingerprint {
    ShaderFingerprint(crc32fast::hash(bytecode))
}

pub fn role_of(fingerprint: ShaderFingerprint) -> Option<ShaderRole> {
    match fingerprint {
        TAA_FINGERPRINT => Some(ShaderRole::Taa),
        SHARPEN_FINGERPRINT => Some(ShaderRole::Sharpen),
        _ => None,
    }
}

/// Result of inspecting one pipeline-creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationOutcome {
    #[default]
    Unclassified,
    RecognizedAsTaa,
    ReplacedAsSharpen,
}

impl ClassificationOutcome {
    /// Whether bytecode was swapped and the host must compile the new code.
    pub const fn is_replaced(self) -> bool {
        matches!(self, ClassificationOutcome::ReplacedAsSharpen)
    }

    pub const fn role(self) -> Option<ShaderRole> {
        match self {
            ClassificationOutcome::Unclassified => None,
            ClassificationOutcome::RecognizedAsTaa => Some(ShaderRole::Taa),
            ClassificationOutcome::ReplacedAsSharpen => Some(ShaderRole::Sharpen),
        }
    }
}

/// Compiled shader binaries shipped with the add-on. A missing blob only
/// switches off the role that needs it.
#[derive(Debug, Clone, Default)]
pub struct ShaderBlobs {
    /// Compute shader converting native velocity + depth into NGX motion vectors.
    pub prepare_motion_vectors: Option<Arc<[u8]>>,
    /// Replacement sharpen pixel shader reading intensity from cb1.
    pub sharpen: Option<Arc<[u8]>>,
}

/// Bytecode of a subobject, either the host's or one of ours.
#[derive(Debug, Clone)]
pub enum ShaderCode<'a> {
    Host(&'a [u8]),
    Replaced(Arc<[u8]>),
}

impl ShaderCode<'_> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ShaderCode::Host(code) => code,
            ShaderCode::Replaced(code) => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubobjectKind {
    VertexShader,
    HullShader,
    DomainShader,
    GeometryShader,
    PixelShader,
    ComputeShader,
    Other,
}

/// One entry of a pipeline-creation request.
#[derive(Debug, Clone)]
pub struct PipelineSubobject<'a> {
    pub kind: SubobjectKind,
    pub code: ShaderCode<'a>,
}

impl<'a> PipelineSubobject<'a> {
    pub fn new(kind: SubobjectKind, code: &'a [u8]) -> Self {
        Self {
            kind,
            code: ShaderCode::Host(code),
        }
    }
}

/// Classify every pixel-shader subobject of a creation request, swapping in
/// the sharpen blob where the sharpen shader is found. Without a sharpen blob
/// the host's sharpen shader is left alone and stays unclassified.
pub fn inspect_pipeline(subobjects: &mut [PipelineSubobject<'_>], blobs: &ShaderBlobs) -> ClassificationOutcome {
    let mut outcome = ClassificationOutcome::Unclassified;

    for subobject in subobjects
        .iter_mut()
        .filter(|s| s.kind == SubobjectKind::PixelShader)
    {
        let hash = fingerprint(subobject.code.as_bytes());
        match role_of(hash) {
            Some(ShaderRole::Sharpen) => match &blobs.sharpen {
                Some(sharpen) => {
                    info!("Replacing sharpen pixel shader {} ({} bytes)", hash, sharpen.len());
                    subobject.code = ShaderCode::Replaced(Arc::clone(sharpen));
                    outcome = ClassificationOutcome::ReplacedAsSharpen;
                }
                None => debug!("No replacement for sharpen pixel shader {}", hash),
            },
            Some(ShaderRole::Taa) => {
                debug!("Found TAA pixel shader {}", hash);
                if outcome == ClassificationOutcome::Unclassified {
                    outcome = ClassificationOutcome::RecognizedAsTaa;
                }
            }
            None => {}
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sharpen_host_bytecode, taa_host_bytecode, test_blobs};

    #[test]
    fn fingerprint_is_standard_crc32() {
        assert_eq!(fingerprint(b"123456789"), ShaderFingerprint(0xCBF4_3926));
        assert_eq!(fingerprint(b""), ShaderFingerprint(0));
    }

    #[test]
    fn known_fingerprints_map_to_roles() {
        assert_eq!(role_of(TAA_FINGERPRINT), Some(ShaderRole::Taa));
        assert_eq!(role_of(SHARPEN_FINGERPRINT), Some(ShaderRole::Sharpen));
        assert_eq!(role_of(ShaderFingerprint(0xDEAD_BEEF)), None);
    }

    #[test]
    fn sharpen_shader_is_replaced_with_blob() {
        let blobs = test_blobs();
        let host = sharpen_host_bytecode();
        let vs = b"vertex".to_vec();
        let mut subobjects = [
            PipelineSubobject::new(SubobjectKind::VertexShader, &vs),
            PipelineSubobject::new(SubobjectKind::PixelShader, &host),
        ];

        let outcome = inspect_pipeline(&mut subobjects, &blobs);

        assert_eq!(outcome, ClassificationOutcome::ReplacedAsSharpen);
        assert!(outcome.is_replaced());
        assert_eq!(subobjects[1].code.as_bytes(), &blobs.sharpen.unwrap()[..]);
        assert_eq!(subobjects[0].code.as_bytes(), &vs[..]);
    }

    #[test]
    fn taa_shader_is_recognized_but_untouched() {
        let blobs = test_blobs();
        let host = taa_host_bytecode();
        let mut subobjects = [PipelineSubobject::new(SubobjectKind::PixelShader, &host)];

        let outcome = inspect_pipeline(&mut subobjects, &blobs);

        assert_eq!(outcome, ClassificationOutcome::RecognizedAsTaa);
        assert!(!outcome.is_replaced());
        assert_eq!(subobjects[0].code.as_bytes(), &host[..]);
    }

    #[test]
    fn only_pixel_shaders_participate() {
        let blobs = test_blobs();
        let host = sharpen_host_bytecode();
        let mut subobjects = [
            PipelineSubobject::new(SubobjectKind::ComputeShader, &host),
            PipelineSubobject::new(SubobjectKind::VertexShader, &host),
        ];

        assert_eq!(inspect_pipeline(&mut subobjects, &blobs), ClassificationOutcome::Unclassified);
        assert!(matches!(subobjects[0].code, ShaderCode::Host(_)));
        assert_eq!(inspect_pipeline(&mut [], &blobs), ClassificationOutcome::Unclassified);
    }

    #[test]
    fn sharpen_without_blob_is_left_to_the_host() {
        let blobs = ShaderBlobs {
            sharpen: None,
            ..test_blobs()
        };
        let host = sharpen_host_bytecode();
        let mut subobjects = [PipelineSubobject::new(SubobjectKind::PixelShader, &host)];

        assert_eq!(inspect_pipeline(&mut subobjects, &blobs), ClassificationOutcome::Unclassified);
        assert_eq!(subobjects[0].code.as_bytes(), &host[..]);
    }

    #[test]
    fn sharpen_wins_over_taa_in_one_request() {
        let blobs = test_blobs();
        let taa = taa_host_bytecode();
        let sharpen = sharpen_host_bytecode();
        let mut subobjects = [
            PipelineSubobject::new(SubobjectKind::PixelShader, &sharpen),
            PipelineSubobject::new(SubobjectKind::PixelShader, &taa),
        ];

        assert_eq!(inspect_pipeline(&mut subobjects, &blobs), ClassificationOutcome::ReplacedAsSharpen);
    }
}
