//! The learned model, reached through an external inference command.

use crate::process::resolve_program;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Beam search settings handed to the inference command.
pub const MAX_LENGTH: u32 = 256;
pub const NUM_BEAMS: u32 = 4;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model directory not found: {0}")]
    ModelDirMissing(PathBuf),
    #[error("Inference command not found: {0}")]
    CommandNotFound(String),
    #[error("Inference command failed: {0}")]
    CommandFailed(String),
    #[error("Empty response from model")]
    EmptyResponse,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text generation for a prompt.
pub trait Generator {
    fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// [`Generator`] that runs
/// `<program> <args...> --model <dir> --max-length 256 --num-beams 4 <prompt>`
/// and returns its stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: PathBuf,
    args: Vec<String>,
    model_dir: PathBuf,
}

impl CommandGenerator {
    /// Check the model directory and the command up front, so a broken setup
    /// fails before any prompt is handled.
    ///
    /// `command` is split on whitespace; the first word is the program.
    pub fn new(command: &str, model_dir: &Path) -> Result<Self, ModelError> {
        if !model_dir.is_dir() {
            return Err(ModelError::ModelDirMissing(model_dir.to_path_buf()));
        }

        let parts: Vec<&str> = command.split_whitespace().collect();
        let Some((program, args)) = parts.split_first() else {
            return Err(ModelError::CommandNotFound("(empty command)".to_owned()));
        };
        let program =
            resolve_program(program).ok_or_else(|| ModelError::CommandNotFound((*program).to_owned()))?;

        Ok(Self {
            program,
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            model_dir: model_dir.to_path_buf(),
        })
    }

    fn command(&self, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--model")
            .arg(&self.model_dir)
            .args(["--max-length", &MAX_LENGTH.to_string()])
            .args(["--num-beams", &NUM_BEAMS.to_string()])
            .arg(prompt);
        cmd
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        log::debug!("[model] Generating for {prompt:?}");

        let output = self
            .command(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                output
                    .status
                    .code()
                    .map_or_else(|| "killed by signal".to_owned(), |c| format!("exit code {c}"))
            } else {
                stderr
            };
            return Err(ModelError::CommandFailed(detail));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(stdout)
    }
}
