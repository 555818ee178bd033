//! External site generator invocation.
//!
//! The last step of the `build` task shells out to the configured static-site
//! generator (jekyll by default). The generator is an external collaborator:
//! this step only runs it in the project directory and translates a non-zero
//! exit into a fatal step failure.

use crate::config::GeneratorConfig;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Failed to launch {command}: {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} exited with {status}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
    },
}

/// Run the generator in `project_dir`, inheriting stdout/stderr so its own
/// reporting reaches the user unchanged.
pub fn run(project_dir: &Path, config: &GeneratorConfig) -> Result<(), GeneratorError> {
    let status = Command::new(&config.command)
        .args(&config.args)
        .current_dir(project_dir)
        .status()
        .map_err(|source| GeneratorError::Launch {
            command: config.command.clone(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(GeneratorError::Failed {
            command: config.command.clone(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn successful_command_is_ok() {
        let tmp = TempDir::new().unwrap();
        let config = GeneratorConfig {
            command: "true".to_string(),
            args: vec![],
        };
        assert!(run(tmp.path(), &config).is_ok());
    }

    #[test]
    fn failing_command_is_error() {
        let tmp = TempDir::new().unwrap();
        let config = GeneratorConfig {
            command: "false".to_string(),
            args: vec![],
        };
        let err = run(tmp.path(), &config).unwrap_err();
        assert!(matches!(err, GeneratorError::Failed { .. }));
    }

    #[test]
    fn missing_command_is_launch_error() {
        let tmp = TempDir::new().unwrap();
        let config = GeneratorConfig {
            command: "definitely-not-a-real-binary".to_string(),
            args: vec![],
        };
        let err = run(tmp.path(), &config).unwrap_err();
        assert!(matches!(err, GeneratorError::Launch { .. }));
    }
}
