//! # dpc-agent
//!
//! Embedding layer for the `dpc` device-policy agent. Where [`dpc_core`]
//! owns the privilege/lock coordination state machine, this crate supplies
//! everything a host needs to run it on a real device:
//!
//! - [`store::SqliteFlagStore`]: durable flag storage with the atomic
//!   read-and-clear the boot replay path requires
//! - [`bridge::CommandBridge`]: typed inbound request dispatch for the
//!   UI-layer method bridge
//! - [`policy`]: one-shot, tier-gated device-policy passthroughs
//!   (restrictions, reboot, wipe, inventory, hardware toggles)
//! - [`provision::ProvisioningHandler`]: provisioning-complete bookkeeping
//! - [`runtime::DevicePolicyAgent`]: composition root wiring the above and
//!   the boot-resume relock policy
//! - [`telemetry`]: tracing subscriber setup

pub mod bridge;
pub mod policy;
pub mod provision;
pub mod runtime;
pub mod store;
pub mod telemetry;

pub use bridge::{BridgeRequest, BridgeResponse, CommandBridge, Responder};
pub use policy::{DeviceInfo, PolicyBackend, PolicyPassthrough};
pub use provision::ProvisioningHandler;
pub use runtime::DevicePolicyAgent;
pub use store::SqliteFlagStore;
