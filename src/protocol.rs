//! The boundary between the selection protocol engine and the X server.
//!
//! [`Spy`](crate::spy::Spy) and [`Clipboard`](crate::clipboard::Clipboard) only talk to the X
//! server through [`SelectionReader`] and [`SelectionOwner`]. The x11rb implementations live in
//! [`x11`](crate::x11).

use std::io;

use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xproto::AtomEnum;
pub use x11rb::protocol::xproto::{Atom, Timestamp, Window};
pub use x11rb::NONE;

/// Errors that can occur while talking to the X server.
///
/// All of these are fatal: nothing can be copied or pasted without a working connection.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Couldn't connect to the X server")]
    XConnection(#[source] ConnectError),

    #[error("X server communication error")]
    XCommunication(#[source] ConnectionError),

    #[error("The X server returned an error")]
    XReply(#[source] ReplyError),

    #[error("Couldn't allocate an X resource id")]
    XResourceId(#[source] ReplyOrIdError),

    #[error("A required X extension ({0}) is not supported by the X server")]
    MissingExtension(&'static str),

    #[error("Couldn't wait for events from the X server")]
    Poll(#[source] io::Error),
}

impl Error {
    /// Returns `true` if the X server rejected a single request, as opposed to the connection
    /// failing.
    ///
    /// Peers control the atoms and windows we pass along, so such errors are blamed on the peer
    /// and never end the manager.
    #[inline]
    pub fn is_request_error(&self) -> bool {
        matches!(self, Error::XReply(_))
    }
}

impl From<ConnectionError> for Error {
    fn from(x: ConnectionError) -> Self {
        Error::XCommunication(x)
    }
}

impl From<ReplyError> for Error {
    fn from(x: ReplyError) -> Self {
        match x {
            ReplyError::ConnectionError(err) => Error::XCommunication(err),
            err => Error::XReply(err),
        }
    }
}

impl From<ReplyOrIdError> for Error {
    fn from(x: ReplyOrIdError) -> Self {
        match x {
            ReplyOrIdError::ConnectionError(err) => Error::XCommunication(err),
            err => Error::XResourceId(err),
        }
    }
}

/// A `SelectionRequest` sent by a peer to the selection owner.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct SelectionRequest {
    pub requestor: Window,
    pub selection: Atom,
    pub target: Atom,
    /// The property the requestor wants the data in, or `NONE` for obsolete clients.
    pub property: Atom,
    pub time: Timestamp,
}

impl SelectionRequest {
    /// Returns the property the reply data should be written to.
    ///
    /// Obsolete clients pass `NONE` as the property, in which case the target atom is used.
    #[inline]
    pub fn destination(&self) -> Atom {
        if self.property == NONE {
            self.target
        } else {
            self.property
        }
    }
}

/// A typed property value, as read from or written to a window.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Property {
    pub type_: Atom,
    /// Element width in bits: 8, 16 or 32.
    pub format: u8,
    pub value: Vec<u8>,
}

impl Property {
    /// Creates a byte string property of the given type.
    pub fn bytes(type_: Atom, value: Vec<u8>) -> Self {
        Self {
            type_,
            format: 8,
            value,
        }
    }

    /// Creates an `ATOM` list property, the reply format of `TARGETS`.
    pub fn atoms(atoms: &[Atom]) -> Self {
        Self {
            type_: AtomEnum::ATOM.into(),
            format: 32,
            value: atoms.iter().flat_map(|atom| atom.to_ne_bytes()).collect(),
        }
    }

    /// Interprets the property as a list of atoms.
    ///
    /// Returns `None` if the property doesn't consist of 32-bit elements.
    pub fn to_atoms(&self) -> Option<Vec<Atom>> {
        if self.format != 32 || self.value.len() % 4 != 0 {
            return None;
        }

        let atoms = self
            .value
            .chunks_exact(4)
            .map(|chunk| Atom::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Some(atoms)
    }

    /// Returns the number of elements, as expected by `ChangeProperty`.
    #[inline]
    pub fn len(&self) -> u32 {
        let width = usize::from(self.format / 8).max(1);
        (self.value.len() / width) as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// An event relevant to the selection owner.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ServerEvent {
    /// A peer wants the selection contents or the list of formats.
    Request(SelectionRequest),
    /// Some other client took the selection over.
    Clear,
    /// A pending confirmation timer with the given generation expired.
    Confirm(u32),
    /// Anything else; ignored.
    Other,
}

/// A notification that the owner of the watched selection changed.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct OwnerChange {
    /// The new owner, or `NONE` if the selection was dropped.
    pub owner: Window,
    pub selection: Atom,
}

/// Posts confirmation timer expiries back into the serve loop.
///
/// Used from the timer thread.
pub trait ConfirmNotifier: Send + 'static {
    fn confirm(&self, generation: u32);
}

/// The selection owner's side of the protocol.
pub trait SelectionOwner {
    type Notifier: ConfirmNotifier;

    /// The window that owns the selection while it is held.
    fn window(&self) -> Window;

    /// The `TARGETS` atom.
    fn targets_atom(&self) -> Atom;

    /// Asserts ownership of the selection.
    fn claim(&mut self) -> Result<(), Error>;

    /// Blocks until the next event arrives.
    fn wait_for_event(&mut self) -> Result<ServerEvent, Error>;

    /// Answers a request.
    ///
    /// With `Some(property)` the data is written to the request's
    /// [`destination`](SelectionRequest::destination) and announced; with `None` the request is
    /// refused with a `NONE` property. A `SelectionNotify` is sent back either way.
    fn reply(&mut self, request: &SelectionRequest, data: Option<&Property>)
        -> Result<(), Error>;

    /// The largest property value, in bytes, that [`reply`](Self::reply) can write at once.
    fn max_property_size(&self) -> usize;

    /// Returns a handle for posting [`ServerEvent::Confirm`] from another thread.
    fn notifier(&self) -> Self::Notifier;
}

/// The reading side of the protocol, used to pull data from other selection owners.
pub trait SelectionReader {
    /// The `TARGETS` atom.
    fn targets_atom(&self) -> Atom;

    /// Blocks until the owner of the watched selection changes.
    fn wait_for_owner_change(&mut self) -> Result<OwnerChange, Error>;

    /// Returns the current owner of the watched selection, or `NONE`.
    fn current_owner(&mut self) -> Result<Window, Error>;

    /// Asks the current owner for the selection converted to `target` and waits for the result.
    ///
    /// Returns `None` if the owner refused or didn't answer in time.
    fn convert(&mut self, target: Atom) -> Result<Option<Property>, Error>;

    /// Returns the name of an atom.
    fn format_name(&mut self, format: Atom) -> Result<String, Error>;
}
