//! Power management, tool lookup, and the external populate step.

use std::path::PathBuf;

use crate::tool_traits::ToolArgs;

/// `shutdown -r now` or `shutdown -p now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Reboot,
    PowerOff,
}

impl ToolArgs for Shutdown {
    fn program(&self) -> &'static str {
        "shutdown"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let flag = match self {
            Shutdown::Reboot => "-r",
            Shutdown::PowerOff => "-p",
        };
        vec![flag.into(), "now".into()]
    }
}

/// `which <name>`
#[derive(Debug, Clone)]
pub struct Which {
    pub name: String,
}

impl ToolArgs for Which {
    fn program(&self) -> &'static str {
        "which"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}

/// Run an operator-supplied script that installs the OS image into the
/// mounted boot environment.
///
/// # Environment Contract
///
/// | Variable | Value |
/// |----------|-------|
/// | `INSTALL_ROOT` | mount point of the new environment |
/// | `ROOT_PASSWORD` | only when a password was supplied |
#[derive(Clone)]
pub struct PopulateScript {
    pub script: PathBuf,
    pub root: PathBuf,
    pub password: Option<String>,
}

impl std::fmt::Debug for PopulateScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopulateScript")
            .field("script", &self.script)
            .field("root", &self.root)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ToolArgs for PopulateScript {
    fn program(&self) -> &'static str {
        "sh"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            self.script.display().to_string(),
            self.root.display().to_string(),
        ]
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        let mut env = vec![("INSTALL_ROOT".to_string(), self.root.display().to_string())];
        if let Some(password) = &self.password {
            env.push(("ROOT_PASSWORD".to_string(), password.clone()));
        }
        env
    }

    fn is_destructive(&self) -> bool {
        true
    }
}
