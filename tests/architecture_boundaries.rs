use std::fs;
use std::path::{Path, PathBuf};

fn rs_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
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

fn rel(path: &Path) -> String {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let rel = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string();
    rel.replace('\\', "/")
}

fn violations_in(dir: &str, forbidden: &[&str]) -> Vec<String> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join(dir);
    let mut violations = Vec::new();
    for file in rs_files(&root) {
        let content = fs::read_to_string(&file).unwrap_or_default();
        for needle in forbidden {
            if content.contains(needle) {
                violations.push(format!("{} uses forbidden `{}`", rel(&file), needle));
            }
        }
    }
    violations
}

#[test]
fn launch_module_does_not_read_the_process_table() {
    let violations = violations_in("src/launch", &["sysinfo", "crate::system::table"]);
    assert!(
        violations.is_empty(),
        "Launch/inspection boundary violations:\n{}",
        violations.join("\n")
    );
}

#[test]
fn os_bindings_are_scoped_to_system_platform() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut violations = Vec::new();

    for file in rs_files(&root) {
        let rel_path = rel(&file);
        if rel_path.starts_with("src/system/platform/") {
            continue;
        }
        let content = fs::read_to_string(&file).unwrap_or_default();
        for needle in ["target_os", "libc::", "nix::", "windows_sys::", "libproc::", "num_cpus::"] {
            if content.contains(needle) {
                violations.push(format!(
                    "{} uses `{}` outside the platform boundary",
                    rel_path, needle
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Unexpected OS-specific code:\n{}",
        violations.join("\n")
    );
}
