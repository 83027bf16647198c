//! Stamps the reel-gen binary with the commit, build time and cargo profile
//! reported by `/health` and the startup banner.

use std::path::Path;
use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    watch_git_head();

    emit("GIT_HASH", &commit_hash().unwrap_or_else(|| UNKNOWN.into()));
    emit("BUILD_TIMESTAMP", &build_timestamp());
    emit(
        "BUILD_PROFILE",
        &std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.into()),
    );
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

/// Short hash of HEAD, or `None` outside a git checkout
fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}

/// Local time, RFC 3339 to the second (2026-03-02T09:15:00+01:00)
fn build_timestamp() -> String {
    chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
}

/// Rebuild when the checked-out commit moves, not on every source edit
fn watch_git_head() {
    for candidate in ["../.git/HEAD", ".git/HEAD"] {
        if Path::new(candidate).exists() {
            println!("cargo:rerun-if-changed={}", candidate);
        }
    }
    println!("cargo:rerun-if-changed=build.rs");
}
