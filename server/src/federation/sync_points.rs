use std::collections::{BTreeMap, BTreeSet};

use rti_shared::{FederateHandle, RtiError};

#[derive(Clone, Debug)]
pub struct SyncPoint {
    pub label: String,
    pub tag: Vec<u8>,
    pub registrar: FederateHandle,
    /// Federates that must achieve the point before the federation is
    /// synchronized on it
    pub participants: BTreeSet<FederateHandle>,
    pub achieved: BTreeSet<FederateHandle>,
}

impl SyncPoint {
    pub fn is_synchronized(&self) -> bool {
        self.participants.is_subset(&self.achieved)
    }
}

/// Synchronization points currently announced in a federation
#[derive(Debug, Default)]
pub struct SyncPointManager {
    points: BTreeMap<String, SyncPoint>,
}

impl SyncPointManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a point over `federates`, or over everyone in `joined` when
    /// that set is empty. Returns the federates to announce it to.
    pub fn register(
        &mut self,
        label: &str,
        tag: Vec<u8>,
        registrar: FederateHandle,
        federates: &BTreeSet<FederateHandle>,
        joined: &BTreeSet<FederateHandle>,
    ) -> Result<BTreeSet<FederateHandle>, RtiError> {
        if self.points.contains_key(label) {
            return Err(RtiError::SyncPointLabelNotUnique {
                label: label.to_string(),
            });
        }
        let participants: BTreeSet<FederateHandle> = if federates.is_empty() {
            joined.clone()
        } else {
            federates.intersection(joined).copied().collect()
        };
        self.points.insert(
            label.to_string(),
            SyncPoint {
                label: label.to_string(),
                tag,
                registrar,
                participants: participants.clone(),
                achieved: BTreeSet::new(),
            },
        );
        Ok(participants)
    }

    /// Marks the point achieved by `federate`. Returns the participants
    /// when that completes it; the point is then forgotten.
    pub fn achieve(
        &mut self,
        label: &str,
        federate: FederateHandle,
    ) -> Result<Option<BTreeSet<FederateHandle>>, RtiError> {
        let Some(point) = self.points.get_mut(label) else {
            return Err(RtiError::SyncPointLabelNotAnnounced {
                label: label.to_string(),
            });
        };
        if !point.participants.contains(&federate) {
            return Err(RtiError::SyncPointLabelNotAnnounced {
                label: label.to_string(),
            });
        }
        point.achieved.insert(federate);
        if !point.is_synchronized() {
            return Ok(None);
        }
        Ok(self.points.remove(label).map(|point| point.participants))
    }

    /// Drops a departed federate from every point and returns the points it
    /// was holding up, with their remaining participants
    pub fn remove_federate(&mut self, federate: FederateHandle) -> Vec<(String, BTreeSet<FederateHandle>)> {
        let mut completed = Vec::new();
        for point in self.points.values_mut() {
            point.participants.remove(&federate);
            point.achieved.remove(&federate);
        }
        let done: Vec<String> = self
            .points
            .values()
            .filter(|point| point.is_synchronized())
            .map(|point| point.label.clone())
            .collect();
        for label in done {
            if let Some(point) = self.points.remove(&label) {
                completed.push((label, point.participants));
            }
        }
        completed
    }

    pub fn get(&self, label: &str) -> Option<&SyncPoint> {
        self.points.get(label)
    }

    pub fn labels(&self) -> Vec<String> {
        self.points.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feds(values: &[u32]) -> BTreeSet<FederateHandle> {
        values.iter().map(|value| FederateHandle::new(*value)).collect()
    }

    #[test]
    fn synchronizes_once_everyone_achieves() {
        let mut manager = SyncPointManager::new();
        let announced = manager
            .register("ready", vec![], FederateHandle::new(1), &feds(&[]), &feds(&[1, 2]))
            .unwrap();
        assert_eq!(announced, feds(&[1, 2]));

        assert_eq!(manager.achieve("ready", FederateHandle::new(1)), Ok(None));
        assert_eq!(
            manager.achieve("ready", FederateHandle::new(2)),
            Ok(Some(feds(&[1, 2])))
        );
        assert!(manager.get("ready").is_none());
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut manager = SyncPointManager::new();
        let joined = feds(&[1]);
        manager
            .register("a", vec![], FederateHandle::new(1), &feds(&[]), &joined)
            .unwrap();
        assert!(manager
            .register("a", vec![], FederateHandle::new(1), &feds(&[]), &joined)
            .is_err());
    }

    #[test]
    fn departure_can_complete_a_point() {
        let mut manager = SyncPointManager::new();
        manager
            .register("a", vec![], FederateHandle::new(1), &feds(&[]), &feds(&[1, 2]))
            .unwrap();
        manager.achieve("a", FederateHandle::new(1)).unwrap();
        let completed = manager.remove_federate(FederateHandle::new(2));
        assert_eq!(completed, vec![("a".to_string(), feds(&[1]))]);
    }

    #[test]
    fn outsiders_cannot_achieve() {
        let mut manager = SyncPointManager::new();
        manager
            .register("a", vec![], FederateHandle::new(1), &feds(&[1]), &feds(&[1, 2]))
            .unwrap();
        assert!(manager.achieve("a", FederateHandle::new(2)).is_err());
    }
}
