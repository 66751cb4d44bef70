use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(p) = stack.pop() {
        let entries = match fs::read_dir(&p) {
            Ok(e) => e,
            Err(_) => continue,
        };
        for ent in entries.flatten() {
            let path = ent.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

#[test]
fn pipeline_modules_reach_the_network_only_through_collaborators() {
    // Retrieval, fallback, prompting and orchestration talk to the outside
    // world through DocumentIndex, WebSearchProvider and Llm only.
    let src_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut files = collect_rs_files(&src_root.join("agent"));
    files.extend(collect_rs_files(&src_root.join("retrieve")));
    for name in ["fallback.rs", "prompts.rs", "guardrails.rs"] {
        files.push(src_root.join(name));
    }
    assert!(files.len() >= 5);

    for f in files {
        let text = fs::read_to_string(&f).unwrap_or_default();
        assert!(!text.is_empty(), "missing source file {}", f.display());
        assert!(!text.contains("ureq::"), "direct HTTP call found in {}", f.display());
        assert!(
            !text.contains("std::net::"),
            "direct socket use found in {}",
            f.display()
        );
    }
}

#[test]
fn orchestrator_has_a_single_generation_call_site() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/agent/mod.rs");
    let text = fs::read_to_string(&path).unwrap_or_default();
    assert_eq!(text.matches(".llm()").count(), 1);
}
