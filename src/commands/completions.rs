//! Shell completions command

use clap::CommandFactory;
use packwright::error::{Result, config::invalid as config_invalid};

use crate::cli::CompletionsArgs;

/// Generate shell completions
pub fn run(args: CompletionsArgs) -> Result<()> {
    let shell = parse_shell(&args.shell)?;
    let mut cmd = <crate::cli::Cli as CommandFactory>::command();
    clap_complete::generate(shell, &mut cmd, "packwright", &mut std::io::stdout().lock());
    Ok(())
}

fn parse_shell(name: &str) -> Result<clap_complete::Shell> {
    match name.to_lowercase().as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "elvish" => Ok(clap_complete::Shell::Elvish),
        "fish" => Ok(clap_complete::Shell::Fish),
        "powershell" | "pwsh" => Ok(clap_complete::Shell::PowerShell),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        _ => Err(config_invalid(format!(
            "unknown shell '{}'; supported shells: bash, elvish, fish, powershell, zsh",
            name
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell_names() {
        assert_eq!(parse_shell("bash").ok(), Some(clap_complete::Shell::Bash));
        assert_eq!(parse_shell("Zsh").ok(), Some(clap_complete::Shell::Zsh));
        assert_eq!(parse_shell("pwsh").ok(), Some(clap_complete::Shell::PowerShell));
        assert_eq!(parse_shell("FISH").ok(), Some(clap_complete::Shell::Fish));
    }

    #[test]
    fn test_unknown_shell() {
        let err = parse_shell("tcsh").expect_err("unknown");
        assert!(err.to_string().contains("tcsh"));
    }

    #[test]
    fn test_completions_bash() {
        let args = CompletionsArgs {
            shell: "bash".to_string(),
        };
        assert!(run(args).is_ok());
    }
}
