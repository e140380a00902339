//! Bakes the compiling toolchain version into `PYFUNC_TOOLCHAIN_VERSION`.
//!
//! The value becomes the default compatibility tag recorded in saved
//! artifacts. Failures to query `rustc` leave the variable unset.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let output = match Command::new(rustc).arg("--version").output() {
        Ok(output) if output.status.success() => output,
        _ => return,
    };

    // "rustc 1.78.0 (9b00956e5 2024-04-29)"
    let text = String::from_utf8_lossy(&output.stdout);
    if let Some(version) = text.split_whitespace().nth(1) {
        println!("cargo:rustc-env=PYFUNC_TOOLCHAIN_VERSION={}", version);
    }
}
