// Build script for the Y4KU kernel.
//
// Generates a small build-info banner (git commit, branch, timestamp)
// printed once during L7 bring-up, and wires in the freestanding
// linker script.

use std::env;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=linker.ld");

    if env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("x86_64") {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_default();
        println!("cargo:rustc-link-arg-bin=y4ku_kernel=-T{manifest_dir}/linker.ld");
        println!("cargo:rustc-link-arg-bin=y4ku_kernel=-nostartfiles");
    }

    let git_commit = get_git_commit();
    let git_branch = get_git_branch();
    let build_timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string());

    println!("cargo:rustc-env=Y4KU_GIT_COMMIT={}", git_commit);
    println!("cargo:rustc-env=Y4KU_GIT_BRANCH={}", git_branch);
    println!("cargo:rustc-env=Y4KU_BUILD_TIMESTAMP={}", build_timestamp);
    println!(
        "cargo:rustc-env=Y4KU_PROFILE={}",
        env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string())
    );
}

fn get_git_commit() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|output| output.status.success().then_some(output.stdout))
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn get_git_branch() -> String {
    Command::new("git")
        .args(["branch", "--show-current"])
        .output()
        .ok()
        .and_then(|output| output.status.success().then_some(output.stdout))
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
