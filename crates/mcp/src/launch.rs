//! Mapping from a tool-host script path to the command that runs it.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::server::{DEFAULT_TIMEOUT, ServerConfig};

/// Kind of tool-host script, determined by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    /// A `.js` script run with `node`.
    Node,
    /// A `.py` script run with the platform's Python interpreter.
    Python,
}

impl ServerKind {
    /// Classify a script path.
    pub fn detect(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("js") => Ok(Self::Node),
            Some("py") => Ok(Self::Python),
            _ => Err(Error::UnsupportedServer(path.to_path_buf())),
        }
    }

    /// The interpreter used to launch this kind of script.
    pub fn command(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Python if cfg!(windows) => "python",
            Self::Python => "python3",
        }
    }
}

impl ServerConfig {
    /// Build a launch configuration for a tool-host script.
    pub fn for_script(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let kind = ServerKind::detect(path)?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("server")
            .to_string();

        Ok(Self {
            name,
            command: kind.command().to_string(),
            args: vec![path.display().to_string()],
            env: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
