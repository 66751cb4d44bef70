fn main() {
    // Best-effort: embed the git commit hash reported by `nyaya status`.
    if let Ok(out) = std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
    {
        if out.status.success() {
            let hash = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if !hash.is_empty() {
                println!("cargo:rustc-env=GIT_COMMIT_HASH={hash}");
            }
        }
    }
}
