#[path = "src/clipboard_stack.rs"]
mod clipboard_stack;

use std::error::Error;
use std::fs::{self, File};
use std::path::PathBuf;

use clap::{Command, CommandFactory};
use clap_complete::{generate_to, Shell};
use clap_mangen::Man;

const NAME: &str = "clipboard-stack";

fn output_dir(kind: &str) -> Result<PathBuf, Box<dyn Error>> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../target")
        .join(kind);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Writes the man page to `target/man` and shell completions to `target/completions`.
fn generate(cmd: &mut Command) -> Result<(), Box<dyn Error>> {
    let mut page = File::create(output_dir("man")?.join(format!("{NAME}.1")))?;
    Man::new(cmd.clone()).render(&mut page)?;

    let completions = output_dir("completions")?;
    for shell in [Shell::Bash, Shell::Fish, Shell::Zsh] {
        generate_to(shell, cmd, NAME, &completions)?;
    }

    Ok(())
}

fn main() {
    println!("cargo::rerun-if-changed=src/clipboard_stack.rs");

    let mut cmd = clipboard_stack::Options::command();
    cmd.set_bin_name(NAME);

    if let Err(err) = generate(&mut cmd) {
        println!("cargo::warning=error generating the man page and completions: {err}");
    }
}
