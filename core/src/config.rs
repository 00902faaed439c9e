//! Environment-driven settings.
//!
//! A `.env` file in the working directory (or any parent) is loaded first;
//! variables already set in the process environment win over it.

use crate::error::AppError;
use std::path::{Path, PathBuf};

pub const LLVM_PATH_VAR: &str = "LOCAL_LLVM_PATH";
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const MODEL_VAR: &str = "OMP_IMPACT_MODEL";
pub const INFER_CMD_VAR: &str = "OMP_IMPACT_INFER_CMD";

pub const DEFAULT_MODEL_DIR: &str = "extra/omp_t5_model2";
pub const DEFAULT_INFER_CMD: &str = "omp-t5-generate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the local LLVM checkout used for AST validation.
    pub llvm_path: Option<PathBuf>,
    pub github_token: Option<String>,
    pub model_dir: PathBuf,
    pub infer_command: String,
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("[config] Loaded {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("[config] Ignoring unreadable .env: {e}"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            llvm_path: get(LLVM_PATH_VAR).map(PathBuf::from),
            github_token: get(TOKEN_VAR),
            model_dir: get(MODEL_VAR).map_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR), PathBuf::from),
            infer_command: get(INFER_CMD_VAR).unwrap_or_else(|| DEFAULT_INFER_CMD.to_owned()),
        }
    }

    /// The checkout root, which must be configured and exist.
    pub fn require_checkout(&self) -> Result<&Path, AppError> {
        let path = self
            .llvm_path
            .as_deref()
            .ok_or_else(|| AppError::config(format!("{LLVM_PATH_VAR} is not set")))?;
        if !path.is_dir() {
            return Err(AppError::config(format!(
                "{LLVM_PATH_VAR} points to {}, which is not a directory",
                path.display()
            )));
        }
        Ok(path)
    }

    pub fn require_token(&self) -> Result<&str, AppError> {
        self.github_token
            .as_deref()
            .ok_or_else(|| AppError::config(format!("{TOKEN_VAR} is not set")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]);
        assert_eq!(s.llvm_path, None);
        assert_eq!(s.model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
        assert_eq!(s.infer_command, DEFAULT_INFER_CMD);
        assert!(s.require_token().is_err());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let s = settings(&[(TOKEN_VAR, "  "), (MODEL_VAR, "")]);
        assert_eq!(s.github_token, None);
        assert_eq!(s.model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
    }

    #[test]
    fn test_require_checkout() {
        let err = settings(&[]).require_checkout().unwrap_err();
        assert!(err.to_string().contains("LOCAL_LLVM_PATH is not set"));
        assert!(!err.is_recoverable());

        let err = settings(&[(LLVM_PATH_VAR, "/nonexistent/llvm-project")])
            .require_checkout()
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));

        let dir = tempfile::tempdir().unwrap();
        let s = settings(&[(LLVM_PATH_VAR, dir.path().to_str().unwrap())]);
        assert_eq!(s.require_checkout().unwrap(), dir.path());
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            (TOKEN_VAR, "ghp_abc"),
            (MODEL_VAR, "/models/t5"),
            (INFER_CMD_VAR, "python3 infer.py"),
        ]);
        assert_eq!(s.require_token().unwrap(), "ghp_abc");
        assert_eq!(s.model_dir, PathBuf::from("/models/t5"));
        assert_eq!(s.infer_command, "python3 infer.py");
    }
}
