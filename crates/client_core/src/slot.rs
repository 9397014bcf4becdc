//! Generation counters that decide whether a response is still wanted.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// One logical slot (active run, active deep dive, a list fetch). Only the most
/// recently issued token may settle it; everything older is stale.
#[derive(Debug, Default)]
pub struct RequestSlot {
    latest: u64,
    in_flight: bool,
}

impl RequestSlot {
    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        self.in_flight = true;
        RequestToken(self.latest)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.in_flight && token.0 == self.latest
    }

    /// Returns `false` when the token was superseded; the caller must drop the response.
    pub fn settle(&mut self, token: RequestToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.in_flight = false;
        true
    }

    /// Supersedes whatever is in flight without starting a new request.
    pub fn invalidate(&mut self) {
        self.latest += 1;
        self.in_flight = false;
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}
