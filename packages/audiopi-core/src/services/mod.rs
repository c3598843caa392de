//! Service layer: the operations behind each HTTP route.
//!
//! Each service owns a handle to the shared [`CommandRunner`](crate::exec::CommandRunner)
//! and turns tool output into typed results. Failures of the tools themselves
//! are returned as `ok: false` values; only caller errors become
//! [`AudioPiError`](crate::error::AudioPiError).

pub mod multiroom;
pub mod registry;
pub mod system;
pub mod volume;
pub mod wifi;

pub use multiroom::{MultiroomCoordinator, MultiroomMode, MultiroomReport};
pub use registry::{
    LogicalService, ServiceAction, ServiceActionReport, ServiceRegistry, ServiceSnapshot,
    ServiceUnits, UnitState,
};
pub use system::{RebootResult, SystemService};
pub use volume::{VolumeChange, VolumeService};
pub use wifi::{WifiConnectResult, WifiNetwork, WifiScan, WifiService};
