//! Backend process configuration.

use std::path::PathBuf;

/// How to spawn one backend server process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The executable path or command name.
    pub command: PathBuf,
    /// Arguments to pass to the backend.
    pub args: Vec<String>,
    /// Working directory for the spawned process.
    pub working_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Builds a configuration for a bare command.
    #[must_use]
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn builds_a_bare_command() {
        let config = ServerConfig::new("rust-analyzer");

        assert_eq!(config.command, PathBuf::from("rust-analyzer"));
        assert!(config.args.is_empty());
        assert!(config.working_dir.is_none());
    }

    #[rstest]
    fn builder_accumulates_args_and_working_dir() {
        let config = ServerConfig::new("tsgo")
            .arg("--lsp")
            .args(["--stdio"])
            .with_working_dir("/workspace");

        assert_eq!(config.args, vec!["--lsp", "--stdio"]);
        assert_eq!(config.working_dir, Some(PathBuf::from("/workspace")));
    }
}
