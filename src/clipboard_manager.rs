//! Running the clipboard manager.

use std::time::Duration;

use log::{info, warn};
use x11rb::protocol::xproto::AtomEnum;

use crate::clipboard::{Clipboard, DEFAULT_CONFIRM_DELAY};
use crate::content::{ContentManager, PassthroughContentManager, StackContentManager};
use crate::protocol::{Atom, Error, SelectionOwner, SelectionReader};
use crate::spy::Spy;
use crate::utils::is_image;
use crate::x11::{X11Owner, X11Reader};
use crate::SelectionType;

/// Default limit on the size of a single extracted format.
pub const DEFAULT_MAX_SIZE: usize = 1_000_000;

/// Default time to wait for the selection owner to answer a conversion.
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(1);

/// How copied entries are kept.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, PartialOrd, Ord, Default)]
pub enum ContentMode {
    /// Keep every copied entry on a stack, popping it once it's pasted.
    #[default]
    Stack,
    /// Keep only the last copied entry, like a regular clipboard.
    Passthrough,
}

/// Options and flags that are used to customize the clipboard manager.
#[derive(Clone, Eq, PartialEq, Debug, Hash, PartialOrd, Ord)]
pub struct Options {
    /// The selection to manage.
    selection: SelectionType,

    /// How long to wait after a delivery for further requests before considering the paste over.
    confirm_delay: Duration,

    /// How copied entries are kept.
    content_mode: ContentMode,

    /// Maximum number of bytes extracted per format.
    max_size: usize,

    /// How long to wait for the selection owner to answer a conversion.
    conversion_timeout: Duration,

    /// The X display to connect to, `$DISPLAY` if `None`.
    display: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            selection: SelectionType::default(),
            confirm_delay: DEFAULT_CONFIRM_DELAY,
            content_mode: ContentMode::default(),
            max_size: DEFAULT_MAX_SIZE,
            conversion_timeout: DEFAULT_CONVERSION_TIMEOUT,
            display: None,
        }
    }
}

impl Options {
    /// Creates a set of options with the defaults.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selection to manage.
    #[inline]
    pub fn selection(&mut self, selection: SelectionType) -> &mut Self {
        self.selection = selection;
        self
    }

    /// Sets the grace period after a delivery.
    ///
    /// Peers often ask for the same data several times during one paste, and never say when
    /// they're done. An entry is only popped once no requests arrived for this long after a
    /// delivery. Longer delays are more robust against slow peers, but pasting twice in quick
    /// succession may then paste the same entry twice.
    #[inline]
    pub fn confirm_delay(&mut self, confirm_delay: Duration) -> &mut Self {
        self.confirm_delay = confirm_delay;
        self
    }

    /// Sets how copied entries are kept.
    #[inline]
    pub fn content_mode(&mut self, content_mode: ContentMode) -> &mut Self {
        self.content_mode = content_mode;
        self
    }

    /// Sets the maximum number of bytes extracted per format.
    #[inline]
    pub fn max_size(&mut self, max_size: usize) -> &mut Self {
        self.max_size = max_size;
        self
    }

    /// Sets how long to wait for the selection owner to answer a conversion.
    #[inline]
    pub fn conversion_timeout(&mut self, conversion_timeout: Duration) -> &mut Self {
        self.conversion_timeout = conversion_timeout;
        self
    }

    /// Sets the X display to connect to.
    #[inline]
    pub fn display(&mut self, display: Option<String>) -> &mut Self {
        self.display = display;
        self
    }

    /// Runs the clipboard manager.
    ///
    /// This function **blocks** forever and only returns if communication with the X server
    /// fails.
    pub fn run(&self) -> Result<(), Error> {
        let display = self.display.as_deref();

        let owner = X11Owner::connect(display, self.selection)?;
        let reader = X11Reader::connect(
            display,
            self.selection,
            self.max_size,
            self.conversion_timeout,
        )?;
        let mut spy = Spy::new(reader, owner.window());

        info!("Managing the {:?} selection", self.selection);

        let text_format: Atom = AtomEnum::STRING.into();
        match self.content_mode {
            ContentMode::Stack => {
                let content = StackContentManager::new(text_format);
                let mut clipboard = Clipboard::new(owner, content, self.confirm_delay);
                forward(&mut spy, &mut clipboard)
            }
            ContentMode::Passthrough => {
                let content = PassthroughContentManager::new(text_format);
                let mut clipboard = Clipboard::new(owner, content, self.confirm_delay);
                forward(&mut spy, &mut clipboard)
            }
        }
    }
}

/// Copies everything the spy extracts into the clipboard.
///
/// Entries consisting only of images are skipped: the application they were copied from keeps
/// the selection and serves them itself, and the stack is left untouched.
pub fn forward<R, O, C>(spy: &mut Spy<R>, clipboard: &mut Clipboard<O, C>) -> Result<(), Error>
where
    R: SelectionReader,
    O: SelectionOwner,
    C: ContentManager,
{
    loop {
        let entry = spy.next_entry()?;

        let names = spy.format_names(&entry)?;
        if !names.is_empty() && names.iter().all(|name| is_image(name)) {
            warn!("Skipping image content: {}", names.join(", "));
            continue;
        }

        info!("Copied {} formats", entry.len());
        clipboard.copy(entry)?;
    }
}
