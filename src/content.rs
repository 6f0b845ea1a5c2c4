//! Clipboard entries and where they are kept.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::protocol::Atom;

/// Everything one copy operation put into the clipboard: the data in each format it was offered
/// in.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct ClipboardEntry {
    formats: BTreeMap<Atom, Vec<u8>>,
}

impl ClipboardEntry {
    /// Creates an entry with no formats.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds data in the given format, replacing the previous data in that format if any.
    pub fn insert(&mut self, format: Atom, data: Vec<u8>) {
        self.formats.insert(format, data);
    }

    /// Returns the data in the given format.
    pub fn get(&self, format: Atom) -> Option<&[u8]> {
        self.formats.get(&format).map(Vec::as_slice)
    }

    pub fn contains(&self, format: Atom) -> bool {
        self.formats.contains_key(&format)
    }

    /// Returns the formats this entry can be pasted as, in ascending atom order.
    pub fn formats(&self) -> impl Iterator<Item = Atom> + '_ {
        self.formats.keys().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl FromIterator<(Atom, Vec<u8>)> for ClipboardEntry {
    fn from_iter<I: IntoIterator<Item = (Atom, Vec<u8>)>>(iter: I) -> Self {
        Self {
            formats: iter.into_iter().collect(),
        }
    }
}

/// Decides which entry is on the clipboard.
pub trait ContentManager {
    /// Something was copied.
    fn put(&mut self, entry: ClipboardEntry);

    /// Returns the entry that should be pasted right now.
    ///
    /// There is always one, even if nothing was copied yet.
    fn peek(&self) -> &ClipboardEntry;

    /// The entry returned by `peek()` was pasted.
    fn consume(&mut self);
}

/// Keeps copied entries on a stack, pasting and popping the most recent one.
#[derive(Clone, Debug)]
pub struct StackContentManager {
    entries: Vec<ClipboardEntry>,
    empty: ClipboardEntry,
}

impl StackContentManager {
    /// Creates an empty stack.
    ///
    /// While the stack is empty, an empty string in `text_format` is pasted.
    pub fn new(text_format: Atom) -> Self {
        Self {
            entries: Vec::new(),
            empty: ClipboardEntry::from_iter([(text_format, Vec::new())]),
        }
    }

    /// Returns the stacked entries, oldest first.
    #[inline]
    pub fn entries(&self) -> &[ClipboardEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentManager for StackContentManager {
    fn put(&mut self, entry: ClipboardEntry) {
        self.entries.push(entry);
        info!("Stacked a new entry, {} in total", self.entries.len());
    }

    fn peek(&self) -> &ClipboardEntry {
        match self.entries.last() {
            Some(entry) => entry,
            None => {
                debug!("The stack is empty, offering an empty string");
                &self.empty
            }
        }
    }

    fn consume(&mut self) {
        if self.entries.pop().is_some() {
            info!("Entry consumed, {} left", self.entries.len());
        } else {
            warn!("Nothing to consume, the stack is empty");
        }
    }
}

/// Behaves like a regular clipboard: keeps the last copied entry and never pops it.
#[derive(Clone, Debug)]
pub struct PassthroughContentManager {
    current: ClipboardEntry,
}

impl PassthroughContentManager {
    /// Creates a clipboard holding an empty string in `text_format`.
    pub fn new(text_format: Atom) -> Self {
        Self {
            current: ClipboardEntry::from_iter([(text_format, Vec::new())]),
        }
    }
}

impl ContentManager for PassthroughContentManager {
    fn put(&mut self, entry: ClipboardEntry) {
        self.current = entry;
    }

    fn peek(&self) -> &ClipboardEntry {
        &self.current
    }

    fn consume(&mut self) {}
}
