// Build script that tries to generate the C header with `cbindgen`.
// Without `cbindgen` on PATH it copies the checked-in `include/thump.h` to $OUT_DIR.

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/thump.h");

    let (Some(crate_dir), Some(out_dir)) = (env::var_os("CARGO_MANIFEST_DIR"), env::var_os("OUT_DIR")) else {
        return;
    };
    let crate_dir = PathBuf::from(crate_dir);
    let out_dir = PathBuf::from(out_dir);
    let header_repo = crate_dir.join("include").join("thump.h");
    let header_out = out_dir.join("thump.h");

    let generated = Command::new("cbindgen")
        .arg("--crate")
        .arg("thump-ffi")
        .arg("--lang")
        .arg("C")
        .arg("--output")
        .arg(&header_out)
        .current_dir(&crate_dir)
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    if generated {
        println!("cargo:warning=thump-ffi: generated header with cbindgen -> {}", header_out.display());
        return;
    }

    if header_repo.exists() {
        if let Err(e) = fs::copy(&header_repo, &header_out) {
            println!("cargo:warning=thump-ffi: could not copy include/thump.h: {e}");
        }
    } else {
        let placeholder = b"/* thump.h placeholder: install cbindgen or keep include/thump.h checked in */\n";
        let _ = fs::write(&header_out, placeholder);
    }
}
