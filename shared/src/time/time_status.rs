use rti_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::types::LogicalTime;

/// Life cycle of regulation and constraint: `Off -> Pending -> On -> Off`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriState {
    Off,
    Pending,
    On,
}

/// Progress of a federate's current time-advance request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdvanceState {
    /// No request outstanding
    None,
    /// Waiting for a grant
    Requested,
    /// Granted by the RTI, not yet acknowledged by a new request
    Provisional,
}

/// Flavour of a time-advance request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdvanceKind {
    TimeAdvance,
    TimeAdvanceAvailable,
    NextEvent,
    NextEventAvailable,
    FlushQueue,
}

impl AdvanceKind {
    pub fn is_next_event(&self) -> bool {
        matches!(self, AdvanceKind::NextEvent | AdvanceKind::NextEventAvailable)
    }

    pub fn is_available(&self) -> bool {
        matches!(
            self,
            AdvanceKind::TimeAdvanceAvailable | AdvanceKind::NextEventAvailable
        )
    }
}

impl Serde for AdvanceKind {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_byte(match self {
            AdvanceKind::TimeAdvance => 0,
            AdvanceKind::TimeAdvanceAvailable => 1,
            AdvanceKind::NextEvent => 2,
            AdvanceKind::NextEventAvailable => 3,
            AdvanceKind::FlushQueue => 4,
        });
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(AdvanceKind::TimeAdvance),
            1 => Ok(AdvanceKind::TimeAdvanceAvailable),
            2 => Ok(AdvanceKind::NextEvent),
            3 => Ok(AdvanceKind::NextEventAvailable),
            4 => Ok(AdvanceKind::FlushQueue),
            tag => Err(SerdeErr::UnknownTag {
                type_name: "AdvanceKind",
                tag: u32::from(tag),
            }),
        }
    }
}

/// Time state of one federate. The LRC keeps the authoritative copy of its
/// own status and the RTI keeps one per joined federate.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeStatus {
    pub regulating: TriState,
    pub constrained: TriState,
    pub advancing: AdvanceState,
    pub current_time: LogicalTime,
    pub requested_time: LogicalTime,
    pub lookahead: LogicalTime,
    /// Earliest time at which this federate may still send a time-stamped
    /// message: current (or requested) time plus lookahead
    pub lbts: LogicalTime,
    /// Deliver receive-order messages even when not advancing
    pub asynchronous: bool,
}

impl TimeStatus {
    pub fn new() -> Self {
        Self {
            regulating: TriState::Off,
            constrained: TriState::Off,
            advancing: AdvanceState::None,
            current_time: 0.0,
            requested_time: 0.0,
            lookahead: 0.0,
            lbts: 0.0,
            asynchronous: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_regulating(&self) -> bool {
        self.regulating == TriState::On
    }

    pub fn is_regulating_pending(&self) -> bool {
        self.regulating == TriState::Pending
    }

    pub fn is_constrained(&self) -> bool {
        self.constrained == TriState::On
    }

    pub fn is_constrained_pending(&self) -> bool {
        self.constrained == TriState::Pending
    }

    /// True while a request waits for its grant
    pub fn is_in_advancing_state(&self) -> bool {
        self.advancing == AdvanceState::Requested
    }

    pub fn is_advance_request_outstanding(&self) -> bool {
        self.advancing != AdvanceState::None
    }

    pub fn time_advance_requested(&mut self, time: LogicalTime) {
        self.requested_time = time;
        self.lbts = time + self.lookahead;
        self.advancing = AdvanceState::Requested;
    }

    /// RTI side: the grant has been issued, the federate is now at `time`
    pub fn advance_federate(&mut self, time: LogicalTime) {
        self.current_time = time;
        self.lbts = time + self.lookahead;
        self.advancing = AdvanceState::Provisional;
    }

    /// LRC side: the grant callback has been delivered
    pub fn advance_grant_callback_processed(&mut self, time: LogicalTime) {
        self.advancing = AdvanceState::None;
        self.current_time = time;
        self.requested_time = time;
    }

    pub fn set_lookahead(&mut self, lookahead: LogicalTime) {
        self.lookahead = lookahead;
        let base = if self.advancing == AdvanceState::Requested {
            self.requested_time
        } else {
            self.current_time
        };
        self.lbts = base + lookahead;
    }

    /// Whether a grant may be issued given the federation-wide LBTS
    pub fn can_advance(&self, federation_lbts: LogicalTime) -> bool {
        if self.advancing != AdvanceState::Requested {
            return false;
        }
        if !self.is_constrained() {
            return true;
        }
        self.requested_time < federation_lbts
    }
}

impl Default for TimeStatus {
    fn default() -> Self {
        Self::new()
    }
}

fn ser_tri_state(state: TriState, writer: &mut ByteWriter) {
    writer.write_byte(match state {
        TriState::Off => 0,
        TriState::Pending => 1,
        TriState::On => 2,
    });
}

fn de_tri_state(reader: &mut ByteReader) -> Result<TriState, SerdeErr> {
    match reader.read_byte()? {
        0 => Ok(TriState::Off),
        1 => Ok(TriState::Pending),
        2 => Ok(TriState::On),
        tag => Err(SerdeErr::UnknownTag {
            type_name: "TriState",
            tag: u32::from(tag),
        }),
    }
}

impl Serde for TimeStatus {
    fn ser(&self, writer: &mut ByteWriter) {
        ser_tri_state(self.regulating, writer);
        ser_tri_state(self.constrained, writer);
        writer.write_byte(match self.advancing {
            AdvanceState::None => 0,
            AdvanceState::Requested => 1,
            AdvanceState::Provisional => 2,
        });
        self.current_time.ser(writer);
        self.requested_time.ser(writer);
        self.lookahead.ser(writer);
        self.lbts.ser(writer);
        self.asynchronous.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let regulating = de_tri_state(reader)?;
        let constrained = de_tri_state(reader)?;
        let advancing = match reader.read_byte()? {
            0 => AdvanceState::None,
            1 => AdvanceState::Requested,
            2 => AdvanceState::Provisional,
            tag => {
                return Err(SerdeErr::UnknownTag {
                    type_name: "AdvanceState",
                    tag: u32::from(tag),
                })
            }
        };
        Ok(Self {
            regulating,
            constrained,
            advancing,
            current_time: f64::de(reader)?,
            requested_time: f64::de(reader)?,
            lookahead: f64::de(reader)?,
            lbts: f64::de(reader)?,
            asynchronous: bool::de(reader)?,
        })
    }
}
