/// Single-flight guard for a component's network request.
///
/// At most one request is outstanding; `begin` while busy is refused rather
/// than queued. Every request carries a generation ticket, and a response is
/// only applied while its ticket is still current, so responses arriving
/// after [`RequestGate::cancel`] (e.g. on unmount) are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestGate {
    generation: u64,
    in_flight: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl RequestGate {
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn begin(&mut self) -> Option<Ticket> {
        if self.in_flight.is_some() {
            return None;
        }
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = Some(self.generation);
        Some(Ticket(self.generation))
    }

    /// Settle a request. Returns `true` when the caller should apply the
    /// response, `false` when it has been superseded or cancelled.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        if self.in_flight != Some(ticket.0) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Abandon any outstanding request; its response will be ignored.
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = None;
    }
}
