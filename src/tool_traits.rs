//! Type-safe tool invocation contracts.
//!
//! Every external program the installer drives (`gpart`, `zpool`, `mount`,
//! ...) is described by a struct implementing `ToolArgs`. The struct is the
//! contract: flag spelling and argument order live in exactly one place, and
//! callers cannot pass a disk where a partition is expected.

/// Trait for typed tool arguments.
///
/// # Contract
///
/// - `program()`: the executable, resolved through `PATH`.
/// - `to_cli_args()`: arguments exactly as the tool expects them.
/// - `get_env_vars()`: extra environment, if any.
/// - `is_destructive()`: true if the call rewrites on-disk state. Destructive
///   calls are logged at `warn` level so the log shows every write.
///
/// # Example
///
/// ```
/// use bootpool_install::tool_traits::ToolArgs;
/// use bootpool_install::tools::gpart::GpartDestroy;
///
/// let args = GpartDestroy { disk: "ada0".to_string() };
/// assert_eq!(args.program(), "gpart");
/// assert_eq!(args.to_cli_args(), vec!["destroy", "-F", "ada0"]);
/// assert!(args.is_destructive());
/// ```
pub trait ToolArgs {
    /// Executable name.
    fn program(&self) -> &'static str;

    /// Convert struct fields to CLI arguments.
    fn to_cli_args(&self) -> Vec<String>;

    /// Environment variables the tool requires.
    fn get_env_vars(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Whether the invocation writes to a disk, pool, or dataset.
    fn is_destructive(&self) -> bool {
        false
    }

    /// Full command line for logs and error messages.
    fn render(&self) -> String {
        let args = self.to_cli_args();
        if args.is_empty() {
            self.program().to_string()
        } else {
            format!("{} {}", self.program(), args.join(" "))
        }
    }
}
