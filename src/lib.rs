//! A stack-based clipboard manager for the X11 selection protocol.
//!
//! Every time an application copies something, the current selection owner is asked for its
//! contents in all formats it offers, and the result is pushed onto a stack. The manager then
//! takes over the selection itself and answers paste requests from the top of the stack. Once a
//! paste is over, the top entry is popped and the next one becomes visible, so copying several
//! things in a row and then pasting several times in a row gives them back in reverse order.
//!
//! X11 has no way to tell when a peer is done reading the selection. Applications ask for the
//! list of targets and for the contents in any order and as many times as they like. A paste is
//! therefore considered over once no further requests arrive for a short grace period (200 ms
//! by default, see [`Options::confirm_delay`](clipboard_manager::Options::confirm_delay)).
//!
//! Owner change notifications come from the XFixes extension, which must be supported by the X
//! server.
//!
//! The protocol engine ([`spy::Spy`] and [`clipboard::Clipboard`]) is written against the traits
//! in [`protocol`], with the x11rb implementation living in [`x11`].
//!
//! # Examples
//!
//! Running the manager on the regular clipboard:
//! ```no_run
//! # extern crate x11_clipboard_stack;
//! # use x11_clipboard_stack::Error;
//! # fn foo() -> Result<(), Error> {
//! use std::time::Duration;
//! use x11_clipboard_stack::clipboard_manager::Options;
//!
//! let mut opts = Options::new();
//! opts.confirm_delay(Duration::from_millis(300));
//! opts.run()?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

#[cfg(test)]
mod tests;

pub mod clipboard;
pub mod clipboard_manager;
mod confirm;
pub mod content;
pub mod protocol;
pub mod spy;
pub mod utils;
pub mod x11;

pub use protocol::Error;

/// The selection to manage.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, PartialOrd, Ord, Default)]
pub enum SelectionType {
    /// The `CLIPBOARD` selection, used by explicit copy and paste actions.
    #[default]
    Clipboard,
    /// The `PRIMARY` selection, set by selecting text and pasted with the middle mouse button.
    Primary,
}
