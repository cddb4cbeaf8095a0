//! Loads the compiled shaders shipped next to the settings file.

use anyhow::{bail, Context, Result};
use dlaa_core::ShaderBlobs;
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const PREPARE_MOTION_VECTORS_FILE: &str = "PrepareMotionVectors.cso";
/// Named after the checksum of the host shader it replaces.
pub const SHARPEN_FILE: &str = "0x0D1CD1AA.cso";

fn read_blob(dir: &Path, name: &str) -> Result<Arc<[u8]>> {
    let path = dir.join(name);
    let bytes = fs::read(&path).with_context(|| format!("Failed to read shader {}", path.display()))?;
    if bytes.is_empty() {
        bail!("Shader {} is empty", path.display());
    }
    Ok(Arc::from(bytes))
}

fn load_optional(dir: &Path, name: &str, role: &str) -> Option<Arc<[u8]>> {
    match read_blob(dir, name) {
        Ok(blob) => {
            info!("Loaded {} ({} bytes)", name, blob.len());
            Some(blob)
        }
        Err(e) => {
            warn!("{} disabled: {:#}", role, e);
            None
        }
    }
}

/// Load each shader on its own; a missing or empty file only turns off the
/// feature that needs it.
pub fn load_blobs(dir: &Path) -> ShaderBlobs {
    ShaderBlobs {
        prepare_motion_vectors: load_optional(dir, PREPARE_MOTION_VECTORS_FILE, "DLAA"),
        sharpen: load_optional(dir, SHARPEN_FILE, "Sharpen replacement"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("ffxv_dlaa_shaders_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_both_blobs() {
        let dir = temp_dir("ok");
        fs::write(dir.join(PREPARE_MOTION_VECTORS_FILE), b"cs").unwrap();
        fs::write(dir.join(SHARPEN_FILE), b"ps").unwrap();

        let blobs = load_blobs(&dir);
        assert_eq!(blobs.prepare_motion_vectors.as_deref(), Some(&b"cs"[..]));
        assert_eq!(blobs.sharpen.as_deref(), Some(&b"ps"[..]));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_sharpen_keeps_motion_vector_shader() {
        let dir = temp_dir("no_sharpen");
        fs::write(dir.join(PREPARE_MOTION_VECTORS_FILE), b"cs").unwrap();

        let blobs = load_blobs(&dir);
        assert_eq!(blobs.prepare_motion_vectors.as_deref(), Some(&b"cs"[..]));
        assert!(blobs.sharpen.is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_motion_vector_shader_keeps_sharpen() {
        let dir = temp_dir("empty_cs");
        fs::write(dir.join(PREPARE_MOTION_VECTORS_FILE), b"").unwrap();
        fs::write(dir.join(SHARPEN_FILE), b"ps").unwrap();

        let blobs = load_blobs(&dir);
        assert!(blobs.prepare_motion_vectors.is_none());
        assert_eq!(blobs.sharpen.as_deref(), Some(&b"ps"[..]));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn read_errors_name_the_file() {
        let dir = temp_dir("missing");
        let err = read_blob(&dir, SHARPEN_FILE).unwrap_err();
        assert!(format!("{:#}", err).contains(SHARPEN_FILE));

        fs::write(dir.join(SHARPEN_FILE), b"").unwrap();
        let err = read_blob(&dir, SHARPEN_FILE).unwrap_err();
        assert!(err.to_string().contains("empty"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
