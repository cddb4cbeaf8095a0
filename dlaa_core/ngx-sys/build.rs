use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=NVIDIA_NGX_SDK_PATH");

    // The NGX SDK only ships Windows libraries; other targets get the
    // declarations without anything to link against.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    let sdk_path = match env::var("NVIDIA_NGX_SDK_PATH") {
        Ok(p) => PathBuf::from(p),
        Err(_) => {
            println!("cargo:warning=NVIDIA_NGX_SDK_PATH is not set, nvsdk_ngx will not be linked");
            return;
        }
    };

    let lib_path = sdk_path.join("lib/Windows_x86_64/x64");
    if !lib_path.exists() {
        panic!(
            "NGX SDK library path does not exist: {}. Please verify NVIDIA_NGX_SDK_PATH points at the DLSS SDK root",
            lib_path.display()
        );
    }

    println!("cargo:rustc-link-search=native={}", lib_path.display());
    // Static runtime build (/MD) of the NGX loader
    println!("cargo:rustc-link-lib=static=nvsdk_ngx_d");
}
