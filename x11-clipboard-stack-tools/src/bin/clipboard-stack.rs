#![deny(unsafe_code)]

use std::env;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::trace;
use x11_clipboard_stack::clipboard_manager::{self, ContentMode};
use x11_clipboard_stack::SelectionType;
use x11_clipboard_stack_tools::clipboard_stack::Options;

fn manager_options(x: Options) -> clipboard_manager::Options {
    let mut opts = clipboard_manager::Options::new();
    opts.selection(if x.primary {
        SelectionType::Primary
    } else {
        SelectionType::Clipboard
    })
    .confirm_delay(Duration::from_millis(x.delay))
    .content_mode(if x.passthrough {
        ContentMode::Passthrough
    } else {
        ContentMode::Stack
    })
    .max_size(x.max_size)
    .display(x.display);
    opts
}

fn main() -> Result<(), anyhow::Error> {
    // Parse command-line options.
    let options = Options::parse();

    // The debug toggle gives at least info level, the same as a single -v.
    let debug = env::var_os("CLIPBOARD_STACK_DEBUG").is_some_and(|x| !x.is_empty());
    let verbose = if debug {
        options.verbose.max(1)
    } else {
        options.verbose
    };

    stderrlog::new()
        .verbosity(usize::from(verbose) + 1)
        .init()
        .unwrap();

    let options = manager_options(options);
    trace!("{:?}", options);

    options
        .run()
        .context("The clipboard manager stopped")?;

    Ok(())
}
