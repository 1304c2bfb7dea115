use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config_file::{HeadlessConfig, SelectionRules};
use crate::installer::RunConfig;
use crate::types::WhenDone;

/// bootpool-install - Provision a ZFS boot pool onto bare disks
#[derive(Parser, Debug)]
#[command(name = "bootpool-install")]
#[command(about = "Install or upgrade a boot pool on the selected disks")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub install: InstallArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Install onto the selected disks (the default)
    Install,
    /// Validate a headless configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// List the disks an install may use
    Disks {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Flags shaping an install run.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Preserve an existing installation's configuration
    #[arg(long, global = true)]
    pub upgrade: bool,

    /// Root password handed to the populate step
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// What to do after a successful install (reboot, wait, halt)
    #[arg(long, global = true)]
    pub when_done: Option<WhenDone>,

    /// Headless configuration file; makes the run unattended
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Managed product variant: always create swap
    #[arg(long, global = true)]
    pub managed: bool,

    /// Force the swap decision (yes or no)
    #[arg(long, global = true)]
    pub swap: Option<String>,

    /// Destination disk; repeat for a mirror. Makes the run unattended
    #[arg(long = "disk", global = true)]
    pub disks: Vec<String>,

    /// Script that installs the system image into the new environment
    #[arg(long, global = true)]
    pub populate: Option<PathBuf>,

    /// Skip the root privilege check (development only)
    #[arg(long, global = true)]
    pub skip_root_check: bool,
}

impl InstallArgs {
    /// Combine the flags with an optional headless file. Flags win.
    pub fn run_config(&self, file: Option<&HeadlessConfig>) -> RunConfig {
        let disks: Vec<String> = self
            .disks
            .iter()
            .map(|d| d.trim_start_matches("/dev/").to_string())
            .collect();

        let selection = match file {
            Some(file) => {
                let mut rules = file.selection();
                if !disks.is_empty() {
                    rules.disks = disks;
                }
                Some(rules)
            }
            None if !disks.is_empty() => Some(SelectionRules {
                disks,
                ..Default::default()
            }),
            None => None,
        };

        RunConfig {
            upgrade: self.upgrade || file.and_then(|f| f.upgrade).unwrap_or(false),
            password: self
                .password
                .clone()
                .or_else(|| file.and_then(|f| f.password.clone())),
            when_done: self
                .when_done
                .or_else(|| file.and_then(|f| f.when_done))
                .unwrap_or_default(),
            managed: self.managed,
            swap_override: self.swap.clone(),
            selection,
            ..Default::default()
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// The subcommand, `install` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Install)
    }
}
