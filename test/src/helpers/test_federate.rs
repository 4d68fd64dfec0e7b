use std::{
    ops::{Deref, DerefMut},
    thread,
    time::{Duration, Instant},
};

use rti_client::{Callback, RtiAmbassador};
use rti_shared::{FederateHandle, LogicalTime, ObjectHandle};

use crate::{battle, Battle};

const WAIT: Duration = Duration::from_secs(2);
const POLL: Duration = Duration::from_millis(5);

/// A joined federate and every callback it has seen, in order
pub struct TestFederate {
    ambassador: RtiAmbassador,
    seen: Vec<Callback>,
    pub battle: Battle,
}

impl TestFederate {
    pub fn new(ambassador: RtiAmbassador) -> Self {
        Self {
            ambassador,
            seen: Vec::new(),
            battle: battle(),
        }
    }

    pub fn handle(&self) -> FederateHandle {
        self.ambassador
            .federate_handle()
            .expect("test federates are joined")
    }

    pub fn tick(&mut self) {
        let callbacks = self.ambassador.tick();
        self.seen.extend(callbacks);
    }

    pub fn seen(&self) -> &[Callback] {
        &self.seen
    }

    pub fn forget(&mut self) {
        self.seen.clear();
    }

    /// Ticks until a matching callback has been seen. `None` on timeout.
    pub fn wait_for(&mut self, matches: impl Fn(&Callback) -> bool) -> Option<Callback> {
        let deadline = Instant::now() + WAIT;
        loop {
            self.tick();
            if let Some(callback) = self.seen.iter().find(|callback| matches(callback)) {
                return Some(callback.clone());
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(POLL);
        }
    }

    pub fn wait_for_count(&mut self, count: usize, matches: impl Fn(&Callback) -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        loop {
            self.tick();
            if self.seen.iter().filter(|callback| matches(callback)).count() >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(POLL);
        }
    }

    /// Ticks until `condition` holds for the ambassador
    pub fn wait_until(&mut self, condition: impl Fn(&RtiAmbassador) -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        loop {
            self.tick();
            if condition(&self.ambassador) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(POLL);
        }
    }

    /// Keeps ticking for a while, for checking that something does not
    /// happen
    pub fn idle(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            self.tick();
            thread::sleep(POLL);
        }
    }

    pub fn wait_for_grant(&mut self) -> Option<LogicalTime> {
        match self.wait_for(|callback| matches!(callback, Callback::TimeAdvanceGrant { .. })) {
            Some(Callback::TimeAdvanceGrant { time }) => Some(time),
            _ => None,
        }
    }

    pub fn wait_for_discovery(&mut self) -> Option<ObjectHandle> {
        match self.wait_for(|callback| matches!(callback, Callback::DiscoverObject { .. })) {
            Some(Callback::DiscoverObject { object, .. }) => Some(object),
            _ => None,
        }
    }

    /// Publishes and subscribes to every tank attribute
    pub fn join_tank_crew(&mut self) {
        let tank = self.battle.tank;
        let attributes = self.battle.tank_attributes();
        self.ambassador
            .publish_object_class(tank, &attributes)
            .expect("publish should succeed");
        self.ambassador
            .subscribe_object_class(tank, &attributes)
            .expect("subscribe should succeed");
    }

    /// Publishes the tank class and registers one instance
    pub fn register_tank(&mut self, name: &str) -> ObjectHandle {
        self.join_tank_crew();
        let tank = self.battle.tank;
        self.ambassador
            .register_object(tank, Some(name))
            .expect("register should succeed")
    }
}

impl Deref for TestFederate {
    type Target = RtiAmbassador;

    fn deref(&self) -> &Self::Target {
        &self.ambassador
    }
}

impl DerefMut for TestFederate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ambassador
    }
}
