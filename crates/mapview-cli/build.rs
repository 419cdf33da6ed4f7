use std::process::Command;

fn git(args: &[&str]) -> Option<std::process::Output> {
    Command::new("git").args(args).output().ok()
}

/// Short commit hash, suffixed with `-dirty` for uncommitted changes
fn git_version() -> String {
    let hash = git(&["rev-parse", "--short", "HEAD"])
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let dirty = git(&["diff-index", "--quiet", "HEAD"])
        .map(|output| !output.status.success())
        .unwrap_or(false);

    if dirty {
        format!("{}-dirty", hash)
    } else {
        hash
    }
}

fn main() {
    let version = env!("CARGO_PKG_VERSION");

    // Release builds report the crate version, everything else the commit
    let version_str = match std::env::var("PROFILE").as_deref() {
        Ok("release") => version.to_string(),
        _ => format!("{} ({})", version, git_version()),
    };

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rustc-env=VERSION_STRING={}", version_str);
}
