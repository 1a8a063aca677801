//! Build script for dbgr-core
//!
//! - Checks the minimum Rust version (Edition 2021 = Rust 1.56.0+, `Option::is_some_and` needs 1.70)
//! - Exports the compiler version as `DBGR_RUSTC_VERSION` so the details panel
//!   of every dump can show which toolchain produced the binary

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    match rustc_version::version() {
        Ok(rustc_version) => {
            let min_rust_version = rustc_version::Version::new(1, 70, 0);
            if rustc_version < min_rust_version {
                panic!("dbgr-core requires Rust {min_rust_version} or newer, found {rustc_version}");
            }
            println!("cargo:rustc-env=DBGR_RUSTC_VERSION={rustc_version}");
        }
        Err(_) => {
            // If we can't get version (e.g., in some build environments), just warn
            println!("cargo:warning=could not verify Rust version");
            println!("cargo:rustc-env=DBGR_RUSTC_VERSION=unknown");
        }
    }
}
