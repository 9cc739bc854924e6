/// Build script for linking the native GASAL2 shim.
///
/// The CUDA backend is feature-gated: without `--features cuda` this script
/// does nothing and the crate builds as pure Rust with the host reference
/// engine. With the feature enabled we link against a prebuilt libgasal
/// (built by GASAL2's own Makefile) plus the CUDA runtime.
use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=GASAL2_LIB_DIR");
    println!("cargo:rerun-if-env-changed=CUDA_HOME");

    if env::var_os("CARGO_FEATURE_CUDA").is_none() {
        return;
    }

    if let Ok(dir) = env::var("GASAL2_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }
    if let Ok(cuda_home) = env::var("CUDA_HOME") {
        println!("cargo:rustc-link-search=native={cuda_home}/lib64");
    }

    println!("cargo:rustc-link-lib=dylib=gasal");
    println!("cargo:rustc-link-lib=dylib=cudart");
}
