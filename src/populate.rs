//! Writing the operating system into the new boot environment.
//!
//! Installing the image is not this crate's job. The orchestrator hands the
//! mounted root to a `Populator` and carries on once it returns.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::tool_runner::{SystemRunner, ToolRunner};
use crate::tools::system::PopulateScript;

/// Fills a mounted boot environment with the system image.
pub trait Populator {
    fn populate(&self, root: &Path, password: Option<&str>) -> Result<()>;
}

/// Runs an external script with the mount point as its argument.
pub struct ScriptPopulator<R: ToolRunner = SystemRunner> {
    runner: R,
    script: PathBuf,
}

impl ScriptPopulator<SystemRunner> {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self::with_runner(SystemRunner, script)
    }
}

impl<R: ToolRunner> ScriptPopulator<R> {
    pub fn with_runner(runner: R, script: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            script: script.into(),
        }
    }
}

impl<R: ToolRunner> Populator for ScriptPopulator<R> {
    fn populate(&self, root: &Path, password: Option<&str>) -> Result<()> {
        let args = PopulateScript {
            script: self.script.clone(),
            root: root.to_path_buf(),
            password: password.map(str::to_string),
        };
        self.runner.run_checked(&args)?;
        Ok(())
    }
}

/// Leaves the environment as it is, for runs where the image is installed
/// by something else.
#[derive(Debug, Default)]
pub struct SkipPopulate;

impl Populator for SkipPopulate {
    fn populate(&self, root: &Path, _password: Option<&str>) -> Result<()> {
        tracing::info!("No populate step configured; {} left empty", root.display());
        Ok(())
    }
}
