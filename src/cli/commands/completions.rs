//! Completions command - print a shell completion script.

use std::io::{self, Write};

use clap::Command;
use clap_complete::Shell;

#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode completions bash > ~/.local/share/bash-completion/completions/bocode\n    \
    bocode completions zsh > ~/.zfunc/_bocode\n    \
    bocode completions fish > ~/.config/fish/completions/bocode.fish")]
pub struct Args {
    #[arg(value_name = "SHELL", value_enum)]
    pub shell: Shell,
}

/// Writes the script for `args.shell`, describing `cli`, to stdout.
pub fn run(args: Args, cli: &mut Command) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    write_script(args.shell, cli, &mut out);
    out.flush()?;
    Ok(())
}

fn write_script(shell: Shell, cli: &mut Command, out: &mut impl Write) {
    clap_complete::generate(shell, cli, "bocode", out);
}
