fn main() {
    // Tell cargo to re-run if linker scripts change
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=link.x");
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (unit and integration tests) link normally; only the
    // bare-metal image needs our memory layout.
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "none" {
        return;
    }

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    println!("cargo:rustc-link-search=native={}", manifest_dir);
    println!("cargo:rustc-link-arg-bins=-T{}/memory.x", manifest_dir);
    println!("cargo:rustc-link-arg-bins=-T{}/link.x", manifest_dir);
    println!("cargo:rustc-link-arg-bins=--no-relax");
}
