use std::process::Command;

fn main() {
    // CI images have no .git directory and pass the commit in SOURCE_COMMIT.
    let commit = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|c| !c.is_empty())
        .or_else(|| std::env::var("SOURCE_COMMIT").ok())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=O2PARIS_COMMIT={commit}");
    println!("cargo:rerun-if-env-changed=SOURCE_COMMIT");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
