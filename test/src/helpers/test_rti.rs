use std::net::SocketAddr;

use rti_client::{LrcConfig, RtiAmbassador};
use rti_server::{Rti, RtiConfig};

use crate::{battle, TestFederate, BATTLE};

/// An RTI on a free local port, shut down when dropped
pub struct TestRti {
    rti: Rti,
}

impl TestRti {
    pub fn start() -> Self {
        Self::start_with(RtiConfig {
            address: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..RtiConfig::default()
        })
    }

    pub fn start_with(config: RtiConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let rti = Rti::start(config).expect("RTI should start");
        Self { rti }
    }

    pub fn address(&self) -> SocketAddr {
        self.rti.local_addr()
    }

    pub fn rti(&self) -> &Rti {
        &self.rti
    }

    pub fn connect(&self) -> RtiAmbassador {
        RtiAmbassador::connect(LrcConfig {
            rti_address: self.address(),
            ..LrcConfig::default()
        })
        .expect("LRC should connect")
    }

    /// Creates the battle federation with a throwaway connection
    pub fn create_battle(&self) {
        let mut ambassador = self.connect();
        ambassador
            .create_federation(BATTLE, battle().model)
            .expect("battle should be created");
        ambassador.disconnect();
    }

    /// Connects a new LRC and joins it to the battle federation
    pub fn join(&self, name: &str) -> TestFederate {
        let mut ambassador = self.connect();
        ambassador
            .join_federation(name, "test", BATTLE)
            .expect("join should succeed");
        TestFederate::new(ambassador)
    }
}

impl Drop for TestRti {
    fn drop(&mut self) {
        self.rti.shutdown();
    }
}
