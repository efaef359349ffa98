//! Shell completion generation command.

use anyhow::Result;
use clap::Command;
use clap_complete::{Shell, generate};
use nucleus_core::cli::ExitCode;
use std::io::Write;
use tracing::info;

/// Writes the completion script for `shell` to `out`.
///
/// # Examples
///
/// ```
/// use clap::Command;
/// use clap_complete::Shell;
/// use nucleus_explorer_cli::commands::completions::write_completions;
///
/// let mut script = Vec::new();
/// write_completions(Shell::Bash, &mut Command::new("nucleus-explorer"), &mut script);
/// assert!(String::from_utf8(script).unwrap().contains("nucleus-explorer"));
/// ```
pub fn write_completions(shell: Shell, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(shell, cmd, name, out);
}

/// Prints the completion script for `shell` to stdout.
///
/// # Errors
///
/// Never fails; the `Result` keeps the command signature uniform.
pub fn run(shell: Shell, cmd: &mut Command) -> Result<ExitCode> {
    info!("Generating {shell} completions");
    write_completions(shell, cmd, &mut std::io::stdout());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::CommandFactory;

    #[test]
    fn test_completions_cover_subcommands() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
            let mut script = Vec::new();
            write_completions(shell, &mut Cli::command(), &mut script);
            let script = String::from_utf8(script).unwrap();
            assert!(script.contains("probe"), "{shell} script lacks mcp probe");
        }
    }
}
