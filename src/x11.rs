//! The X11 side of the protocol, implemented with x11rb.
//!
//! [`X11Owner`] and [`X11Reader`] each open their own connection and create their own unmapped
//! window. Keeping them apart means that owner change notifications received while the clipboard
//! is serving simply queue up for the spy, and conversion replies never get mixed up with
//! requests from peers.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use rustix::event::{poll, PollFd, PollFlags};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xfixes::{self, ConnectionExt as _, SelectionEventMask};
use x11rb::protocol::xproto::{
    AtomEnum, ClientMessageEvent, ConnectionExt as _, CreateWindowAux, EventMask, PropMode,
    SelectionNotifyEvent, WindowClass, SELECTION_NOTIFY_EVENT,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT, CURRENT_TIME};

use crate::protocol::{
    Atom, ConfirmNotifier, Error, OwnerChange, Property, SelectionOwner, SelectionReader,
    SelectionRequest, ServerEvent, Window, NONE,
};
use crate::SelectionType;

/// `WM_NAME` of the selection owner window.
pub const OWNER_WINDOW_NAME: &str = "x11-clipboard-stack";

/// `WM_NAME` of the spy window.
pub const SPY_WINDOW_NAME: &str = "x11-clipboard-stack spy";

// Fixed part of a ChangeProperty request.
const CHANGE_PROPERTY_HEADER: usize = 24;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        CLIPBOARD,
        TARGETS,
        INCR,
        DATA: b"_X11_CLIPBOARD_STACK_DATA",
        CONFIRM: b"_X11_CLIPBOARD_STACK_CONFIRM",
    }
}

struct Session {
    conn: Arc<RustConnection>,
    screen_num: usize,
    atoms: Atoms,
    selection: Atom,
}

impl Session {
    fn connect(display: Option<&str>, selection: SelectionType) -> Result<Self, Error> {
        let (conn, screen_num) = RustConnection::connect(display).map_err(Error::XConnection)?;
        let atoms = Atoms::new(&conn)?.reply()?;

        let selection = match selection {
            SelectionType::Clipboard => atoms.CLIPBOARD,
            SelectionType::Primary => AtomEnum::PRIMARY.into(),
        };

        Ok(Self {
            conn: Arc::new(conn),
            screen_num,
            atoms,
            selection,
        })
    }

    fn create_window(&self, name: &str) -> Result<Window, Error> {
        let root = self.conn.setup().roots[self.screen_num].root;
        let window = self.conn.generate_id()?;

        self.conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            COPY_FROM_PARENT,
            &CreateWindowAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )?;
        self.conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            name.as_bytes(),
        )?;
        self.conn.flush()?;

        trace!("Created window {:#x} ({})", window, name);
        Ok(window)
    }

    fn current_owner(&self) -> Result<Window, Error> {
        Ok(self
            .conn
            .get_selection_owner(self.selection)?
            .reply()?
            .owner)
    }
}

/// Owns the selection on behalf of the [`Clipboard`](crate::clipboard::Clipboard).
pub struct X11Owner {
    session: Session,
    window: Window,
}

impl X11Owner {
    /// Connects to the X server (`$DISPLAY` if `display` is `None`) and creates the owner window.
    pub fn connect(display: Option<&str>, selection: SelectionType) -> Result<Self, Error> {
        let session = Session::connect(display, selection)?;
        let window = session.create_window(OWNER_WINDOW_NAME)?;

        Ok(Self { session, window })
    }

    fn translate(&self, event: Event) -> ServerEvent {
        let Session {
            atoms, selection, ..
        } = &self.session;

        match event {
            Event::SelectionRequest(ev)
                if ev.owner == self.window && ev.selection == *selection =>
            {
                ServerEvent::Request(SelectionRequest {
                    requestor: ev.requestor,
                    selection: ev.selection,
                    target: ev.target,
                    property: ev.property,
                    time: ev.time,
                })
            }
            Event::SelectionClear(ev) if ev.owner == self.window && ev.selection == *selection => {
                ServerEvent::Clear
            }
            Event::ClientMessage(ev)
                if ev.window == self.window && ev.type_ == atoms.CONFIRM && ev.format == 32 =>
            {
                ServerEvent::Confirm(ev.data.as_data32()[0])
            }
            Event::Error(err) => {
                // Usually a requestor window that went away before we replied.
                debug!("X11 error: {:?}", err);
                ServerEvent::Other
            }
            _ => ServerEvent::Other,
        }
    }
}

impl SelectionOwner for X11Owner {
    type Notifier = X11Notifier;

    #[inline]
    fn window(&self) -> Window {
        self.window
    }

    #[inline]
    fn targets_atom(&self) -> Atom {
        self.session.atoms.TARGETS
    }

    fn claim(&mut self) -> Result<(), Error> {
        let conn = &self.session.conn;
        conn.set_selection_owner(self.window, self.session.selection, CURRENT_TIME)?;

        if self.session.current_owner()? != self.window {
            warn!("Couldn't take the selection over");
        } else {
            trace!("Claimed the selection");
        }

        Ok(())
    }

    fn wait_for_event(&mut self) -> Result<ServerEvent, Error> {
        let event = self.session.conn.wait_for_event()?;
        Ok(self.translate(event))
    }

    fn reply(
        &mut self,
        request: &SelectionRequest,
        data: Option<&Property>,
    ) -> Result<(), Error> {
        let conn = &self.session.conn;

        let property = match data {
            Some(data) => {
                let destination = request.destination();
                conn.change_property(
                    PropMode::REPLACE,
                    request.requestor,
                    destination,
                    data.type_,
                    data.format,
                    data.len(),
                    &data.value,
                )?;
                destination
            }
            None => NONE,
        };

        let event = SelectionNotifyEvent {
            response_type: SELECTION_NOTIFY_EVENT,
            sequence: 0,
            time: request.time,
            requestor: request.requestor,
            selection: request.selection,
            target: request.target,
            property,
        };
        conn.send_event(false, request.requestor, EventMask::NO_EVENT, event)?;
        conn.flush()?;

        Ok(())
    }

    fn max_property_size(&self) -> usize {
        self.session
            .conn
            .maximum_request_bytes()
            .saturating_sub(CHANGE_PROPERTY_HEADER)
    }

    fn notifier(&self) -> X11Notifier {
        X11Notifier {
            conn: self.session.conn.clone(),
            window: self.window,
            message_type: self.session.atoms.CONFIRM,
        }
    }
}

/// Delivers confirmations as client messages to the owner window, so that they reach the serve
/// loop in order with everything else.
pub struct X11Notifier {
    conn: Arc<RustConnection>,
    window: Window,
    message_type: Atom,
}

impl ConfirmNotifier for X11Notifier {
    fn confirm(&self, generation: u32) {
        let event =
            ClientMessageEvent::new(32, self.window, self.message_type, [generation, 0, 0, 0, 0]);

        let result = self
            .conn
            .send_event(false, self.window, EventMask::NO_EVENT, event)
            .and_then(|_| self.conn.flush());

        if let Err(err) = result {
            warn!("Couldn't post the paste confirmation: {}", err);
        }
    }
}

/// Reads the selection from other clients on behalf of the [`Spy`](crate::spy::Spy).
pub struct X11Reader {
    session: Session,
    window: Window,
    max_size: usize,
    timeout: Duration,
    // Owner changes that arrived while waiting for a conversion.
    pending: VecDeque<OwnerChange>,
    names: HashMap<Atom, String>,
}

impl X11Reader {
    /// Connects to the X server (`$DISPLAY` if `display` is `None`), creates the spy window and
    /// subscribes to owner changes of the selection.
    ///
    /// Conversions are read up to `max_size` bytes and given up on after `timeout`.
    pub fn connect(
        display: Option<&str>,
        selection: SelectionType,
        max_size: usize,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let session = Session::connect(display, selection)?;
        let conn = &session.conn;

        if conn
            .extension_information(xfixes::X11_EXTENSION_NAME)?
            .is_none()
        {
            return Err(Error::MissingExtension(xfixes::X11_EXTENSION_NAME));
        }
        // The server ignores XFixes requests until the version is negotiated.
        conn.xfixes_query_version(5, 0)?.reply()?;

        let window = session.create_window(SPY_WINDOW_NAME)?;
        conn.xfixes_select_selection_input(
            window,
            session.selection,
            SelectionEventMask::SET_SELECTION_OWNER,
        )?;
        conn.flush()?;

        Ok(Self {
            session,
            window,
            max_size,
            timeout,
            pending: VecDeque::new(),
            names: HashMap::new(),
        })
    }

    fn owner_change(&self, event: &Event) -> Option<OwnerChange> {
        match event {
            Event::XfixesSelectionNotify(ev) if ev.selection == self.session.selection => {
                Some(OwnerChange {
                    owner: ev.owner,
                    selection: ev.selection,
                })
            }
            _ => None,
        }
    }

    /// Returns the next event, or `None` once `deadline` passes.
    fn poll_event(&self, deadline: Instant) -> Result<Option<Event>, Error> {
        let conn = &self.session.conn;

        loop {
            if let Some(event) = conn.poll_for_event()? {
                return Ok(Some(event));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let timeout = i32::try_from(remaining.as_millis())
                .unwrap_or(i32::MAX)
                .max(1);
            let mut fds = [PollFd::new(conn.stream(), PollFlags::IN)];
            match poll(&mut fds, timeout) {
                Ok(_) | Err(rustix::io::Errno::INTR) => (),
                Err(err) => return Err(Error::Poll(err.into())),
            }
        }
    }

    fn read_property(&self, property: Atom) -> Result<Option<Property>, Error> {
        let conn = &self.session.conn;

        let long_length = u32::try_from(self.max_size.div_ceil(4)).unwrap_or(u32::MAX);
        let reply = conn
            .get_property(false, self.window, property, AtomEnum::ANY, 0, long_length)?
            .reply()?;
        conn.delete_property(self.window, property)?;

        if reply.type_ == self.session.atoms.INCR {
            warn!("The owner wants an incremental transfer, which isn't supported");
            return Ok(None);
        }
        if reply.type_ == NONE {
            return Ok(None);
        }
        if reply.bytes_after > 0 {
            debug!("Truncated the data, {} bytes left over", reply.bytes_after);
        }

        Ok(Some(Property {
            type_: reply.type_,
            format: reply.format,
            value: reply.value,
        }))
    }
}

impl SelectionReader for X11Reader {
    #[inline]
    fn targets_atom(&self) -> Atom {
        self.session.atoms.TARGETS
    }

    fn wait_for_owner_change(&mut self) -> Result<OwnerChange, Error> {
        if let Some(change) = self.pending.pop_front() {
            return Ok(change);
        }

        loop {
            let event = self.session.conn.wait_for_event()?;
            if let Some(change) = self.owner_change(&event) {
                return Ok(change);
            }
        }
    }

    fn current_owner(&mut self) -> Result<Window, Error> {
        self.session.current_owner()
    }

    fn convert(&mut self, target: Atom) -> Result<Option<Property>, Error> {
        let selection = self.session.selection;
        {
            let conn = &self.session.conn;
            conn.convert_selection(
                self.window,
                selection,
                target,
                self.session.atoms.DATA,
                CURRENT_TIME,
            )?;
            conn.flush()?;
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            let event = match self.poll_event(deadline)? {
                Some(event) => event,
                None => {
                    debug!("Timed out waiting for target {}", target);
                    return Ok(None);
                }
            };

            match event {
                Event::SelectionNotify(ev)
                    if ev.requestor == self.window
                        && ev.selection == selection
                        && ev.target == target =>
                {
                    if ev.property == NONE {
                        return Ok(None);
                    }
                    return self.read_property(ev.property);
                }
                event => {
                    if let Some(change) = self.owner_change(&event) {
                        self.pending.push_back(change);
                    }
                }
            }
        }
    }

    fn format_name(&mut self, format: Atom) -> Result<String, Error> {
        if let Some(name) = self.names.get(&format) {
            return Ok(name.clone());
        }

        let reply = self.session.conn.get_atom_name(format)?.reply()?;
        let name = String::from_utf8_lossy(&reply.name).into_owned();
        self.names.insert(format, name.clone());

        Ok(name)
    }
}
