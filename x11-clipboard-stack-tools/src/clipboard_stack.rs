use clap::Parser;

#[derive(Parser)]
#[command(
    name = "clipboard-stack",
    version,
    about = "Keep every copied item on a stack, and paste them back one by one."
)]
pub struct Options {
    /// Manage the "primary" selection instead of the clipboard
    ///
    /// The primary selection is set by selecting text and pasted with the middle mouse button.
    #[arg(long, short)]
    pub primary: bool,

    /// Grace period in milliseconds after a paste before the stack is popped
    ///
    /// Applications often request the same data several times during a single paste. The top
    /// entry is only popped once no requests arrived for this long.
    #[arg(long, short, value_name = "MS", default_value_t = 200)]
    pub delay: u64,

    /// Behave like a regular clipboard and never pop the stack
    #[arg(long)]
    pub passthrough: bool,

    /// Maximum number of bytes to copy per format
    #[arg(long, value_name = "BYTES", default_value_t = 1_000_000)]
    pub max_size: usize,

    /// X display to connect to, instead of $DISPLAY
    #[arg(long, value_name = "NAME")]
    pub display: Option<String>,

    /// Enable verbose logging
    ///
    /// Setting the CLIPBOARD_STACK_DEBUG environment variable enables info logging as well.
    #[arg(long, short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
