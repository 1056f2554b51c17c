use std::path::{Path, PathBuf};

/// Fallback when nothing more specific is available.
pub const DEFAULT_INTERPRETER: &str = "python3";

fn has_path_segments(value: &str) -> bool {
    value.contains('/') || value.contains('\\')
}

/// Project-local virtual environment layouts, Windows first.
fn venv_candidates(project_root: &Path) -> Vec<PathBuf> {
    let venv = project_root.join("backend").join(".venv");
    vec![
        venv.join("Scripts").join("python.exe"),
        venv.join("Scripts").join("python"),
        venv.join("bin").join("python3"),
        venv.join("bin").join("python"),
    ]
}

/// Picks the interpreter used for the report scripts.
///
/// A configured bare command (`python3`) is used as-is. A configured path is
/// resolved against the project root and used only if it exists. Otherwise
/// the first existing project virtual environment wins, then the system
/// `python3`.
pub fn resolve_interpreter(configured: Option<&str>, project_root: &Path) -> String {
    if let Some(configured) = configured.map(str::trim).filter(|c| !c.is_empty()) {
        if !has_path_segments(configured) {
            return configured.to_string();
        }

        let path = Path::new(configured);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_root.join(path)
        };
        if resolved.exists() {
            return resolved.to_string_lossy().into_owned();
        }
        log::warn!(
            "Configured interpreter '{}' not found, falling back",
            resolved.display()
        );
    }

    venv_candidates(project_root)
        .into_iter()
        .find(|candidate| candidate.exists())
        .map(|candidate| candidate.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_bare_command_is_trusted() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_interpreter(Some("python3.11"), dir.path()), "python3.11");
    }

    #[test]
    fn test_configured_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tools")).unwrap();
        fs::write(dir.path().join("tools/py"), "").unwrap();

        let resolved = resolve_interpreter(Some("tools/py"), dir.path());
        assert_eq!(PathBuf::from(resolved), dir.path().join("tools/py"));

        let missing = resolve_interpreter(Some("tools/nope"), dir.path());
        assert_eq!(missing, DEFAULT_INTERPRETER);
    }

    #[test]
    fn test_venv_preferred_over_system() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("backend/.venv/bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("python"), "").unwrap();

        let resolved = resolve_interpreter(None, dir.path());
        assert_eq!(PathBuf::from(resolved), bin.join("python"));

        fs::write(bin.join("python3"), "").unwrap();
        let resolved = resolve_interpreter(None, dir.path());
        assert_eq!(PathBuf::from(resolved), bin.join("python3"));
    }

    #[test]
    fn test_system_fallback() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_interpreter(None, dir.path()), DEFAULT_INTERPRETER);
        assert_eq!(resolve_interpreter(Some("  "), dir.path()), DEFAULT_INTERPRETER);
    }
}
