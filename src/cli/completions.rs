use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    packwright completions bash > ~/.bash_completion.d/packwright\n\n\
                  Generate zsh completions:\n    packwright completions zsh > ~/.zfunc/_packwright\n\n\
                  Generate fish completions:\n    packwright completions fish > ~/.config/fish/completions/packwright.fish\n\n\
                  Generate PowerShell completions:\n    packwright completions powershell")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    pub shell: String,
}
