use std::collections::{BTreeSet, HashMap};

use rti_shared::{FederateHandle, RtiError};

#[derive(Clone, Debug)]
struct Coordination {
    label: String,
    waiting_on: BTreeSet<FederateHandle>,
    success: bool,
}

impl Coordination {
    fn new(label: &str, joined: &BTreeSet<FederateHandle>) -> Self {
        Self {
            label: label.to_string(),
            waiting_on: joined.clone(),
            success: true,
        }
    }

    fn report(&mut self, federate: FederateHandle, success: bool) -> bool {
        self.waiting_on.remove(&federate);
        self.success &= success;
        self.waiting_on.is_empty()
    }
}

/// How a federation-wide save or restore ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub label: String,
    pub success: bool,
}

/// Tracks which federates still owe a save or restore report, and keeps
/// the RTI's own state captured under each save label
#[derive(Debug, Default)]
pub struct SaveRestoreManager {
    save: Option<Coordination>,
    restore: Option<Coordination>,
    snapshots: HashMap<String, Vec<u8>>,
}

impl SaveRestoreManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_save_in_progress(&self) -> bool {
        self.save.is_some()
    }

    pub fn is_restore_in_progress(&self) -> bool {
        self.restore.is_some()
    }

    pub fn check_idle(&self) -> Result<(), RtiError> {
        if self.is_save_in_progress() {
            return Err(RtiError::SaveInProgress);
        }
        if self.is_restore_in_progress() {
            return Err(RtiError::RestoreInProgress);
        }
        Ok(())
    }

    // Save

    pub fn begin_save(
        &mut self,
        label: &str,
        joined: &BTreeSet<FederateHandle>,
        snapshot: Vec<u8>,
    ) -> Result<(), RtiError> {
        self.check_idle()?;
        self.save = Some(Coordination::new(label, joined));
        self.snapshots.insert(label.to_string(), snapshot);
        Ok(())
    }

    pub fn save_complete(
        &mut self,
        federate: FederateHandle,
        success: bool,
    ) -> Result<Option<Completion>, RtiError> {
        let save = self.save.as_mut().ok_or(RtiError::SaveNotInitiated)?;
        if !save.report(federate, success) {
            return Ok(None);
        }
        Ok(self.finish_save())
    }

    fn finish_save(&mut self) -> Option<Completion> {
        let save = self.save.take()?;
        if !save.success {
            self.snapshots.remove(&save.label);
        }
        Some(Completion {
            label: save.label,
            success: save.success,
        })
    }

    // Restore

    /// Starts a restore and hands back the RTI state captured by the save
    pub fn begin_restore(
        &mut self,
        label: &str,
        joined: &BTreeSet<FederateHandle>,
    ) -> Result<Vec<u8>, RtiError> {
        self.check_idle()?;
        let snapshot = self
            .snapshots
            .get(label)
            .cloned()
            .ok_or_else(|| RtiError::SaveLabelNotFound {
                label: label.to_string(),
            })?;
        self.restore = Some(Coordination::new(label, joined));
        Ok(snapshot)
    }

    /// Drops a restore that never got going
    pub fn restore_abandoned(&mut self) {
        self.restore = None;
    }

    pub fn restore_complete(
        &mut self,
        federate: FederateHandle,
        success: bool,
    ) -> Result<Option<Completion>, RtiError> {
        let restore = self.restore.as_mut().ok_or(RtiError::RestoreNotRequested)?;
        if !restore.report(federate, success) {
            return Ok(None);
        }
        Ok(self.restore.take().map(|restore| Completion {
            label: restore.label,
            success: restore.success,
        }))
    }

    /// A federate left mid-coordination; stop waiting for it
    pub fn remove_federate(&mut self, federate: FederateHandle) -> Vec<(bool, Completion)> {
        let mut completed = Vec::new();
        if let Some(save) = self.save.as_mut() {
            save.waiting_on.remove(&federate);
            if save.waiting_on.is_empty() {
                if let Some(completion) = self.finish_save() {
                    completed.push((true, completion));
                }
            }
        }
        if let Some(restore) = self.restore.as_mut() {
            restore.waiting_on.remove(&federate);
            if restore.waiting_on.is_empty() {
                if let Some(restore) = self.restore.take() {
                    completed.push((
                        false,
                        Completion {
                            label: restore.label,
                            success: restore.success,
                        },
                    ));
                }
            }
        }
        completed
    }
}
