use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket assigned to a position when it is opened. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketId(pub u64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable arena id of a fair value gap in the scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GapId(pub u32);

/// Stable arena id of an order block in the scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl fmt::Display for GapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fvg-{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ob-{}", self.0)
    }
}

/// Monotonic ticket allocator.
#[derive(Debug, Clone)]
pub struct TicketGen {
    next: u64,
}

impl TicketGen {
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn next_ticket(&mut self) -> TicketId {
        let id = TicketId(self.next);
        self.next += 1;
        id
    }
}

impl Default for TicketGen {
    fn default() -> Self {
        Self::starting_at(1)
    }
}
