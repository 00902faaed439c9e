//! Locating external executables (`gh`, `clang`, the inference command).

use std::path::PathBuf;
use std::process::Command;

/// Find an executable in PATH using `which` (or `where` on Windows).
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let candidates: Vec<String> = if cfg!(target_os = "windows") {
        vec![format!("{name}.exe"), format!("{name}.cmd"), format!("{name}.bat")]
    } else {
        vec![name.to_owned()]
    };

    let which_cmd = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };

    for candidate in candidates {
        if let Ok(output) = Command::new(which_cmd).arg(&candidate).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .trim()
                    .to_owned();
                if !path.is_empty() {
                    return Some(PathBuf::from(path));
                }
            }
        }
    }

    None
}

/// Resolve `program` to a runnable path: used as-is when it names an existing
/// file, otherwise searched for in PATH.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(program);
    if direct.components().count() > 1 || direct.is_absolute() {
        return direct.is_file().then_some(direct);
    }
    find_executable(program)
}
