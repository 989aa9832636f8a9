// pingsweep build script: record the target triple for the version banner

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=PINGSWEEP_TARGET={}", target);
}
