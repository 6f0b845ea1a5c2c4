//! In-memory stand-ins for the X server.
//!
//! [`TestOwner`] is driven by a channel of [`ServerEvent`]s and records everything the clipboard
//! does. [`TestReader`] replays a scripted sequence of owner changes against a set of fake
//! selection owners.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::ErrorKind;
use x11rb::x11_utils::X11Error;

use crate::protocol::*;


pub const OWNER_WINDOW: Window = 0x100;
pub const REQUESTOR_WINDOW: Window = 0x200;

pub const CLIPBOARD: Atom = 69;
pub const STRING: Atom = 31;
pub const TARGETS: Atom = 300;
pub const UTF8_STRING: Atom = 301;
pub const TEXT_HTML: Atom = 302;
pub const IMAGE_PNG: Atom = 303;
pub const TIMESTAMP: Atom = 304;
pub const MULTIPLE: Atom = 305;
pub const REPLY_PROPERTY: Atom = 400;
/// Never interned, so the X server doesn't know its name.
pub const BOGUS_ATOM: Atom = 0xdead;

pub fn format_names() -> HashMap<Atom, &'static str> {
    HashMap::from([
        (STRING, "STRING"),
        (TARGETS, "TARGETS"),
        (UTF8_STRING, "UTF8_STRING"),
        (TEXT_HTML, "text/html"),
        (IMAGE_PNG, "image/png"),
        (TIMESTAMP, "TIMESTAMP"),
        (MULTIPLE, "MULTIPLE"),
    ])
}

pub fn disconnected() -> Error {
    Error::XCommunication(ConnectionError::UnknownError)
}

/// The error the X server sends for a request naming an atom that doesn't exist.
pub fn bad_atom(atom: Atom) -> Error {
    Error::XReply(ReplyError::X11Error(X11Error {
        error_kind: ErrorKind::Atom,
        error_code: 5,
        sequence: 0,
        bad_value: atom,
        minor_opcode: 0,
        major_opcode: 17,
        extension_name: None,
        request_name: Some("GetAtomName"),
    }))
}

pub fn request(target: Atom) -> ServerEvent {
    ServerEvent::Request(SelectionRequest {
        requestor: REQUESTOR_WINDOW,
        selection: CLIPBOARD,
        target,
        property: REPLY_PROPERTY,
        time: 0,
    })
}

#[derive(Debug, Default)]
pub struct OwnerLog {
    pub claims: usize,
    pub replies: Vec<(SelectionRequest, Option<Property>)>,
}

pub struct TestOwner {
    pub max_property_size: usize,
    events: Receiver<ServerEvent>,
    sender: Sender<ServerEvent>,
    log: Arc<Mutex<OwnerLog>>,
}

impl TestOwner {
    /// Returns the owner, a sender for feeding it events and its log.
    pub fn new() -> (Self, Sender<ServerEvent>, Arc<Mutex<OwnerLog>>) {
        let (sender, events) = channel();
        let log = Arc::new(Mutex::new(OwnerLog::default()));

        let owner = TestOwner {
            max_property_size: usize::MAX,
            events,
            sender: sender.clone(),
            log: log.clone(),
        };
        (owner, sender, log)
    }
}

pub struct TestNotifier(Sender<ServerEvent>);

impl ConfirmNotifier for TestNotifier {
    fn confirm(&self, generation: u32) {
        let _ = self.0.send(ServerEvent::Confirm(generation));
    }
}

impl SelectionOwner for TestOwner {
    type Notifier = TestNotifier;

    fn window(&self) -> Window {
        OWNER_WINDOW
    }

    fn targets_atom(&self) -> Atom {
        TARGETS
    }

    fn claim(&mut self) -> Result<(), Error> {
        self.log.lock().unwrap().claims += 1;
        Ok(())
    }

    fn wait_for_event(&mut self) -> Result<ServerEvent, Error> {
        self.events.recv().map_err(|_| disconnected())
    }

    fn reply(
        &mut self,
        request: &SelectionRequest,
        data: Option<&Property>,
    ) -> Result<(), Error> {
        self.log
            .lock()
            .unwrap()
            .replies
            .push((*request, data.cloned()));
        Ok(())
    }

    fn max_property_size(&self) -> usize {
        self.max_property_size
    }

    fn notifier(&self) -> TestNotifier {
        TestNotifier(self.sender.clone())
    }
}

/// A fake client offering some targets, with data for some of them.
#[derive(Debug, Clone, Default)]
pub struct Offer {
    pub targets: Vec<Atom>,
    pub data: HashMap<Atom, Vec<u8>>,
}

impl Offer {
    /// Offers `TARGETS` plus every given format, with data for all of them.
    pub fn new(data: &[(Atom, &str)]) -> Self {
        let mut targets = vec![TARGETS];
        targets.extend(data.iter().map(|&(format, _)| format));

        Self {
            targets,
            data: data
                .iter()
                .map(|&(format, text)| (format, text.as_bytes().to_vec()))
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TestReader {
    pub changes: VecDeque<OwnerChange>,
    /// Overrides the current owner, which otherwise is the owner from the last change.
    pub current: Option<Window>,
    pub offers: HashMap<Window, Offer>,
    pub conversions: Vec<Atom>,
    last_owner: Window,
}

impl TestReader {
    pub fn new(changes: &[Window], offers: HashMap<Window, Offer>) -> Self {
        Self {
            changes: changes
                .iter()
                .map(|&owner| OwnerChange {
                    owner,
                    selection: CLIPBOARD,
                })
                .collect(),
            offers,
            ..Default::default()
        }
    }
}

impl SelectionReader for TestReader {
    fn targets_atom(&self) -> Atom {
        TARGETS
    }

    fn wait_for_owner_change(&mut self) -> Result<OwnerChange, Error> {
        let change = self.changes.pop_front().ok_or_else(disconnected)?;
        self.last_owner = change.owner;
        Ok(change)
    }

    fn current_owner(&mut self) -> Result<Window, Error> {
        Ok(self.current.unwrap_or(self.last_owner))
    }

    fn convert(&mut self, target: Atom) -> Result<Option<Property>, Error> {
        self.conversions.push(target);

        let owner = self.current.unwrap_or(self.last_owner);
        let Some(offer) = self.offers.get(&owner) else {
            return Ok(None);
        };

        if target == TARGETS {
            if offer.targets.is_empty() {
                return Ok(None);
            }
            return Ok(Some(Property::atoms(&offer.targets)));
        }

        Ok(offer
            .data
            .get(&target)
            .map(|data| Property::bytes(target, data.clone())))
    }

    fn format_name(&mut self, format: Atom) -> Result<String, Error> {
        if format == BOGUS_ATOM {
            return Err(bad_atom(format));
        }

        Ok(format_names()
            .get(&format)
            .map_or_else(|| format!("ATOM_{}", format), |name| name.to_string()))
    }
}
