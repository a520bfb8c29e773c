//! Receiver side of the alternating-bit protocol.
//!
//! Each reliable identifier has a one-bit channel: the parity of the next
//! sequence number it will accept. A frame carrying the expected parity is
//! handed to the handler and acknowledged with that parity; anything else is
//! a retransmission of a frame already processed, so it is acknowledged with
//! the opposite parity, its payload zeroed, and the handler left alone.
//!
//! ```text
//!            seq 0: accept, ack 0
//!   ┌──────────────┐ ───────────────────▶ ┌─────────────┐
//!   │ AwaitingEven │                      │ AwaitingOdd │
//!   └──────────────┘ ◀─────────────────── └─────────────┘
//!   other: dup, ack 1  seq 1: accept, ack 1  other: dup, ack 0
//! ```
//!
//! The session-control identifier may report [`Outcome::SessionReset`] from
//! `AwaitingEven`, in which case the channel stays at `AwaitingEven` so that
//! the next session starts from sequence 0.

use framemux_frame::SESSION_CONTROL;

use crate::handler::Outcome;

/// The sequence parity a reliable channel expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    AwaitingEven,
    AwaitingOdd,
}

/// How an inbound frame is treated on a reliable channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// New frame: invoke the handler and reply with `ack`.
    Accept { ack: u8 },
    /// Retransmission: zero the payload and reply with `ack`; the handler is
    /// not invoked.
    Duplicate { ack: u8 },
}

impl ChannelState {
    /// The sequence number this state accepts.
    pub fn expected_seq(self) -> u8 {
        match self {
            ChannelState::AwaitingEven => 0,
            ChannelState::AwaitingOdd => 1,
        }
    }

    /// Classify an inbound sequence number.
    pub fn classify(self, seq: u8) -> Verdict {
        let expected = self.expected_seq();
        if seq == expected {
            Verdict::Accept { ack: expected }
        } else {
            Verdict::Duplicate { ack: expected ^ 1 }
        }
    }

    /// The state after accepting a frame for `id` whose handler reported
    /// `outcome`. Duplicates never change state.
    pub fn after_accept(self, id: u8, outcome: Outcome) -> ChannelState {
        match self {
            ChannelState::AwaitingEven
                if id == SESSION_CONTROL && outcome == Outcome::SessionReset =>
            {
                ChannelState::AwaitingEven
            }
            ChannelState::AwaitingEven => ChannelState::AwaitingOdd,
            // Already heading back to the start state, reset or not.
            ChannelState::AwaitingOdd => ChannelState::AwaitingEven,
        }
    }
}

/// Channel state for every reliable identifier, indexed by identifier.
///
/// Slots exist only for identifiers that were registered as reliable; a
/// lookup on any other identifier yields `None`, never a default state.
#[derive(Debug, Clone)]
pub struct ReliabilityTable {
    slots: [Option<ChannelState>; 256],
}

impl ReliabilityTable {
    pub fn new() -> Self {
        Self { slots: [None; 256] }
    }

    /// Open a channel for `id` at `AwaitingEven`.
    pub fn open(&mut self, id: u8) {
        self.slots[usize::from(id)] = Some(ChannelState::AwaitingEven);
    }

    /// Drop the channel for `id`, if any.
    pub fn close(&mut self, id: u8) {
        self.slots[usize::from(id)] = None;
    }

    pub fn get(&self, id: u8) -> Option<ChannelState> {
        self.slots[usize::from(id)]
    }

    pub fn get_mut(&mut self, id: u8) -> Option<&mut ChannelState> {
        self.slots[usize::from(id)].as_mut()
    }

    /// Number of open channels.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReliabilityTable {
    fn default() -> Self {
        Self::new()
    }
}
