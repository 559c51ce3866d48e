use std::process::Command;

/// リプレイのバナーに出すバージョン文字列
///
/// git のコミットが取れればそれを付け、取れなければパッケージのバージョンだけ。
fn version_string() -> String {
    let pkg = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let describe = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty());
    match describe {
        Some(rev) => format!("{}+{}", pkg, rev),
        None => pkg,
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rustc-env=GIT_VERSION={}", version_string());
}
