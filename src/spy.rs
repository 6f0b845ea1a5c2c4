//! Watching the selection for new owners and pulling their data.

use log::{debug, info, trace};

use crate::content::ClipboardEntry;
use crate::protocol::{Atom, Error, OwnerChange, Property, SelectionReader, Window, NONE};
use crate::utils::is_meta_target;

/// Watches a selection and extracts the data of every client that takes it over.
///
/// The extraction is a series of blocking conversions: first `TARGETS`, then every advertised
/// target in turn. Conversions that fail are left out of the entry.
///
/// Changes made by `ignored_owner` (the window of our own
/// [`Clipboard`](crate::clipboard::Clipboard)) are ignored.
///
/// Peers may advertise atoms that don't exist. The X server's error for such a target only
/// drops that target; connection failures are returned.
pub struct Spy<R> {
    reader: R,
    ignored_owner: Window,
}

impl<R: SelectionReader> Spy<R> {
    pub fn new(reader: R, ignored_owner: Window) -> Self {
        Self {
            reader,
            ignored_owner,
        }
    }

    #[inline]
    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Blocks until some client copies something, and returns what it copied.
    pub fn next_entry(&mut self) -> Result<ClipboardEntry, Error> {
        loop {
            let change = self.reader.wait_for_owner_change()?;
            if let Some(entry) = self.handle_owner_change(change)? {
                return Ok(entry);
            }
        }
    }

    /// Returns the names of the formats of `entry`.
    ///
    /// Formats the X server doesn't know a name for are left out.
    pub fn format_names(&mut self, entry: &ClipboardEntry) -> Result<Vec<String>, Error> {
        let mut names = Vec::with_capacity(entry.len());
        for format in entry.formats() {
            if let Some(name) = self.lookup_name(format)? {
                names.push(name);
            }
        }

        Ok(names)
    }

    fn lookup_name(&mut self, format: Atom) -> Result<Option<String>, Error> {
        match self.reader.format_name(format) {
            Ok(name) => Ok(Some(name)),
            Err(err) if err.is_request_error() => {
                debug!("Couldn't get the name of atom {}: {}", format, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn convert(&mut self, target: Atom) -> Result<Option<Property>, Error> {
        match self.reader.convert(target) {
            Err(err) if err.is_request_error() => {
                debug!("Converting to target {} failed: {}", target, err);
                Ok(None)
            }
            result => result,
        }
    }

    fn handle_owner_change(
        &mut self,
        change: OwnerChange,
    ) -> Result<Option<ClipboardEntry>, Error> {
        let owner = self.reader.current_owner()?;

        if owner == self.ignored_owner {
            trace!("We own the selection now, ignoring");
            return Ok(None);
        }

        if owner == NONE {
            debug!("The selection has no owner, nothing to extract");
            return Ok(None);
        }

        // Notifications queue up while the clipboard is serving; only the last one matters.
        if owner != change.owner {
            trace!("Owner {:#x} is gone, ignoring", change.owner);
            return Ok(None);
        }

        info!("Extracting the selection contents from {:#x}", owner);
        self.extract()
    }

    fn extract(&mut self) -> Result<Option<ClipboardEntry>, Error> {
        let targets_atom = self.reader.targets_atom();

        let targets = match self.convert(targets_atom)? {
            Some(property) => property.to_atoms().unwrap_or_default(),
            None => Vec::new(),
        };
        if targets.is_empty() {
            info!("The owner offered no targets");
            return Ok(None);
        }

        let mut entry = ClipboardEntry::new();
        for target in targets {
            if target == targets_atom || target == NONE || entry.contains(target) {
                continue;
            }

            let Some(name) = self.lookup_name(target)? else {
                continue;
            };
            if is_meta_target(&name) {
                continue;
            }

            trace!("Extracting target {} ({})", target, name);
            match self.convert(target)? {
                Some(property) => entry.insert(target, property.value),
                None => debug!("Couldn't extract target {}", name),
            }
        }

        if entry.is_empty() {
            info!("Couldn't extract any of the offered targets");
            return Ok(None);
        }

        Ok(Some(entry))
    }
}

/// An endless sequence of copied entries.
impl<R: SelectionReader> Iterator for Spy<R> {
    type Item = Result<ClipboardEntry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_entry())
    }
}
