//! Build script for nfs-loadgen
//!
//! With the `libnfs` feature, generates Rust bindings for libnfs using
//! bindgen. Requires libnfs-dev (5.x) to be installed on the system.
//! Without the feature there is nothing to build.

fn main() {
    #[cfg(feature = "libnfs")]
    libnfs::generate();
}

#[cfg(feature = "libnfs")]
mod libnfs {
    use std::env;
    use std::path::PathBuf;

    pub fn generate() {
        // Rerun if wrapper header changes
        println!("cargo:rerun-if-changed=src/nfs/wrapper.h");

        // Find libnfs using pkg-config
        let nfs_lib = match pkg_config::Config::new()
            .atleast_version("5.0.0")
            .probe("libnfs")
        {
            Ok(lib) => lib,
            Err(e) => {
                eprintln!("Error: Could not find libnfs via pkg-config: {}", e);
                eprintln!();
                eprintln!("To install libnfs on Ubuntu/Debian:");
                eprintln!("  sudo apt install libnfs-dev");
                eprintln!();
                eprintln!("Or build without the real backend (omit --features libnfs):");
                eprintln!("  cargo build");
                std::process::exit(1);
            }
        };

        let mut builder = bindgen::Builder::default()
            .header("src/nfs/wrapper.h")
            // Synchronous high-level API only
            .allowlist_function("nfs_.*")
            .allowlist_type("nfsdir")
            .allowlist_type("nfsfh")
            .allowlist_type("nfsdirent")
            .allowlist_type("nfs_stat_64")
            .allowlist_type("nfs_context")
            .allowlist_type("nfs4_lock_op")
            .allowlist_type("statvfs")
            .derive_debug(true)
            .derive_default(true)
            .opaque_type("nfs_context")
            .opaque_type("nfsdir")
            .opaque_type("nfsfh")
            .layout_tests(false)
            .generate_comments(false);

        for path in &nfs_lib.include_paths {
            builder = builder.clang_arg(format!("-I{}", path.display()));
        }

        let bindings = builder
            .generate()
            .expect("Unable to generate libnfs bindings");

        let out_path = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
        bindings
            .write_to_file(out_path.join("nfs_bindings.rs"))
            .expect("Couldn't write bindings!");

        for lib in &nfs_lib.libs {
            println!("cargo:rustc-link-lib={}", lib);
        }

        for path in &nfs_lib.link_paths {
            println!("cargo:rustc-link-search=native={}", path.display());
        }
    }
}
