//! Owning the selection and serving paste requests.

use std::time::Duration;

use log::{debug, info, trace, warn};

use crate::confirm::PendingConfirmation;
use crate::content::{ClipboardEntry, ContentManager};
use crate::protocol::{Error, Property, SelectionOwner, SelectionRequest, ServerEvent};

/// Default grace period after a delivery before the paste is considered over.
pub const DEFAULT_CONFIRM_DELAY: Duration = Duration::from_millis(200);

/// The selection owner.
///
/// Serves the entry [`peek`](ContentManager::peek)ed from its content manager. The first
/// successful content delivery starts a confirmation timer, and every further request restarts
/// it, whether it is answered or not. When the timer runs out, the paste is considered done: the
/// entry is
/// [`consume`](ContentManager::consume)d and the selection is claimed again so that peers notice
/// the next entry.
pub struct Clipboard<O, C> {
    owner: O,
    content: C,
    confirm_delay: Duration,
    owning: bool,
    // Set by a content delivery, cleared once the entry is consumed or the selection is lost.
    delivered: bool,
    // Bumped on every timer start and ownership loss. Confirmations carrying anything but the
    // generation of the live timer are stale.
    generation: u32,
    pending: Option<PendingConfirmation>,
}

impl<O: SelectionOwner, C: ContentManager> Clipboard<O, C> {
    /// Creates an idle clipboard.
    pub fn new(owner: O, content: C, confirm_delay: Duration) -> Self {
        Self {
            owner,
            content,
            confirm_delay,
            owning: false,
            delivered: false,
            generation: 0,
            pending: None,
        }
    }

    #[inline]
    pub fn content(&self) -> &C {
        &self.content
    }

    #[inline]
    pub fn owner(&self) -> &O {
        &self.owner
    }

    /// Returns `true` while the selection is held.
    #[inline]
    pub fn is_owning(&self) -> bool {
        self.owning
    }

    /// Puts `entry` into the clipboard and serves it.
    ///
    /// This function **blocks** until some other client takes the selection over.
    pub fn copy(&mut self, entry: ClipboardEntry) -> Result<(), Error> {
        self.owner.claim()?;
        self.owning = true;
        self.delivered = false;
        self.content.put(entry);

        self.serve()
    }

    /// Serves requests until the selection is lost.
    pub fn serve(&mut self) -> Result<(), Error> {
        while self.owning {
            let event = self.owner.wait_for_event()?;
            self.handle_event(event)?;
        }

        Ok(())
    }

    fn handle_event(&mut self, event: ServerEvent) -> Result<(), Error> {
        match event {
            ServerEvent::Request(request) => self.handle_request(request)?,
            ServerEvent::Confirm(generation) => self.handle_confirm(generation)?,
            ServerEvent::Clear => {
                info!("Another client took the selection over");
                self.owning = false;
                self.delivered = false;
                self.pending = None;
                self.generation = self.generation.wrapping_add(1);
            }
            ServerEvent::Other => (),
        }

        Ok(())
    }

    fn handle_request(&mut self, request: SelectionRequest) -> Result<(), Error> {
        trace!(
            "Request from {:#x} for target {}",
            request.requestor,
            request.target
        );

        // The exchange with the requestor isn't over yet.
        self.pending = None;

        let entry = self.content.peek();
        let targets = self.owner.targets_atom();
        let max_size = self.owner.max_property_size();

        let (reply, delivered) = if request.target == targets {
            let mut formats: Vec<_> = entry.formats().filter(|&f| f != targets).collect();
            formats.push(targets);
            debug!("Offering {} formats", formats.len());
            (Some(Property::atoms(&formats)), false)
        } else if let Some(data) = entry.get(request.target) {
            if data.len() > max_size {
                warn!(
                    "Refusing to deliver {} bytes for target {}, at most {} fit in one request",
                    data.len(),
                    request.target,
                    max_size
                );
                (None, false)
            } else {
                debug!("Delivering {} bytes", data.len());
                (Some(Property::bytes(request.target, data.to_vec())), true)
            }
        } else {
            warn!(
                "Refusing a request for target {}, which isn't offered",
                request.target
            );
            (None, false)
        };

        self.owner.reply(&request, reply.as_ref())?;

        self.delivered |= delivered;
        if self.delivered {
            self.generation = self.generation.wrapping_add(1);
            self.pending = Some(PendingConfirmation::start(
                self.owner.notifier(),
                self.generation,
                self.confirm_delay,
            ));
        }

        Ok(())
    }

    fn handle_confirm(&mut self, generation: u32) -> Result<(), Error> {
        match self.pending.take() {
            Some(pending) if pending.generation() == generation && self.owning => {
                debug!("No requests for {:?}, the paste is over", self.confirm_delay);
                self.content.consume();
                self.delivered = false;
                self.owner.claim()?;
            }
            pending => {
                trace!("Ignoring stale confirmation {}", generation);
                self.pending = pending;
            }
        }

        Ok(())
    }
}
