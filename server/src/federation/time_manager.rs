use std::collections::BTreeMap;

use log::{debug, trace};

use rti_shared::{
    validate_start_time, AdvanceKind, ByteReader, ByteWriter, FederateHandle, LogicalTime,
    RtiError, SaveRestoreTarget, Serde, SerdeErr, TimeConfig, TimeService, TimeStatus, TriState,
};

/// A grant to hand out: the federate and the time it may advance to
pub type Grant = (FederateHandle, LogicalTime);

/// Federation-wide time bookkeeping kept by the RTI. Decides when each
/// constrained federate may be granted the time it asked for.
#[derive(Clone, Debug)]
pub struct TimeManager {
    config: TimeConfig,
    statuses: BTreeMap<FederateHandle, TimeStatus>,
}

impl TimeManager {
    pub fn new(config: TimeConfig) -> Self {
        Self {
            config,
            statuses: BTreeMap::new(),
        }
    }

    pub fn add_federate(&mut self, federate: FederateHandle) {
        self.statuses.insert(federate, TimeStatus::new());
    }

    /// Forgets a federate. Its departure can unblock others, so any grants
    /// that became possible are returned.
    pub fn remove_federate(&mut self, federate: FederateHandle) -> Vec<Grant> {
        if self.statuses.remove(&federate).is_none() {
            return Vec::new();
        }
        self.sweep()
    }

    pub fn status(&self, federate: FederateHandle) -> Option<&TimeStatus> {
        self.statuses.get(&federate)
    }

    fn status_mut(&mut self, federate: FederateHandle) -> Result<&mut TimeStatus, RtiError> {
        self.statuses
            .get_mut(&federate)
            .ok_or(RtiError::FederateNotExecutionMember)
    }

    /// The earliest time any regulating federate may still send a
    /// time-stamped message. `f64::MAX` when nobody regulates.
    pub fn federation_lbts(&self) -> LogicalTime {
        self.statuses
            .values()
            .filter(|status| status.is_regulating())
            .map(|status| status.lbts)
            .fold(f64::MAX, f64::min)
    }

    // Regulation

    /// Returns the confirmed time and the lookahead actually stored
    pub fn enable_regulation(
        &mut self,
        federate: FederateHandle,
        time: LogicalTime,
        lookahead: LogicalTime,
    ) -> Result<(LogicalTime, LogicalTime), RtiError> {
        let lookahead = self.config.validate_lookahead(lookahead)?;
        validate_start_time(time)?;
        let status = self.status_mut(federate)?;
        if status.is_regulating() {
            return Err(RtiError::AlreadyEnabled {
                service: TimeService::Regulation,
            });
        }

        let confirmed = time.max(status.current_time);
        status.regulating = TriState::On;
        status.current_time = confirmed;
        status.requested_time = confirmed;
        status.set_lookahead(lookahead);
        debug!("{federate} regulating at {confirmed} with lookahead {lookahead}");
        Ok((confirmed, lookahead))
    }

    pub fn disable_regulation(&mut self, federate: FederateHandle) -> Result<Vec<Grant>, RtiError> {
        let status = self.status_mut(federate)?;
        if status.regulating == TriState::Off {
            return Err(RtiError::WasNotEnabled {
                service: TimeService::Regulation,
            });
        }
        status.regulating = TriState::Off;
        Ok(self.sweep())
    }

    /// Returns the stored lookahead and any grants a larger lookahead made
    /// possible
    pub fn modify_lookahead(
        &mut self,
        federate: FederateHandle,
        lookahead: LogicalTime,
    ) -> Result<(LogicalTime, Vec<Grant>), RtiError> {
        let lookahead = self.config.validate_lookahead(lookahead)?;
        let status = self.status_mut(federate)?;
        if !status.is_regulating() {
            return Err(RtiError::WasNotEnabled {
                service: TimeService::Regulation,
            });
        }
        if status.is_in_advancing_state() {
            return Err(RtiError::AdvanceAlreadyInProgress);
        }
        status.set_lookahead(lookahead);
        Ok((lookahead, self.sweep()))
    }

    // Constraint

    pub fn enable_constrained(&mut self, federate: FederateHandle) -> Result<LogicalTime, RtiError> {
        let status = self.status_mut(federate)?;
        if status.is_constrained() {
            return Err(RtiError::AlreadyEnabled {
                service: TimeService::Constrained,
            });
        }
        status.constrained = TriState::On;
        Ok(status.current_time)
    }

    pub fn disable_constrained(&mut self, federate: FederateHandle) -> Result<Vec<Grant>, RtiError> {
        let status = self.status_mut(federate)?;
        if status.constrained == TriState::Off {
            return Err(RtiError::WasNotEnabled {
                service: TimeService::Constrained,
            });
        }
        status.constrained = TriState::Off;
        Ok(self.sweep())
    }

    pub fn set_asynchronous(&mut self, federate: FederateHandle, enabled: bool) -> Result<(), RtiError> {
        let status = self.status_mut(federate)?;
        if status.asynchronous == enabled {
            let service = TimeService::AsyncDelivery;
            return Err(if enabled {
                RtiError::AlreadyEnabled { service }
            } else {
                RtiError::WasNotEnabled { service }
            });
        }
        status.asynchronous = enabled;
        Ok(())
    }

    // Advancing

    /// Records a time advance request and returns every grant that can now
    /// be issued, the requester's included if it qualifies
    pub fn time_advance_request(
        &mut self,
        federate: FederateHandle,
        time: LogicalTime,
        kind: AdvanceKind,
    ) -> Result<Vec<Grant>, RtiError> {
        let status = self.status_mut(federate)?;
        if status.is_in_advancing_state() {
            return Err(RtiError::AdvanceAlreadyInProgress);
        }
        if time.is_nan() || time <= status.current_time {
            return Err(RtiError::FederationTimeAlreadyPassed {
                requested: time,
                current: status.current_time,
            });
        }
        trace!("{federate} requests {kind:?} to {time}");
        status.time_advance_requested(time);
        Ok(self.sweep())
    }

    /// Grants every federate whose request is now safe
    fn sweep(&mut self) -> Vec<Grant> {
        let lbts = self.federation_lbts();
        let mut grants = Vec::new();
        for (federate, status) in self.statuses.iter_mut() {
            if status.can_advance(lbts) {
                let time = status.requested_time;
                status.advance_federate(time);
                grants.push((*federate, time));
            }
        }
        if !grants.is_empty() {
            debug!("Granting {grants:?} with LBTS {lbts}");
        }
        grants
    }
}

impl SaveRestoreTarget for TimeManager {
    fn save_to(&self, writer: &mut ByteWriter) {
        let statuses: Vec<(FederateHandle, TimeStatus)> = self
            .statuses
            .iter()
            .map(|(federate, status)| (*federate, status.clone()))
            .collect();
        statuses.ser(writer);
    }

    fn restore_from(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        let statuses = Vec::<(FederateHandle, TimeStatus)>::de(reader)?;
        // federates that joined after the save keep a fresh status
        for (federate, status) in statuses {
            if let Some(current) = self.statuses.get_mut(&federate) {
                *current = status;
            }
        }
        Ok(())
    }
}
