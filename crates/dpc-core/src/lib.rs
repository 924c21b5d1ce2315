//! # dpc-core
//!
//! Privilege and kiosk-lock coordination core for a device-management agent
//! embedded in a managed application.
//!
//! The platform delivers three loosely-coupled lifecycle events with no
//! guaranteed ordering or shared call stack: device-admin activation, boot
//! completion, and application-foreground attachment. This crate owns the
//! state machine that produces a consistent observable state (locked vs.
//! unlocked, launcher vs. not) across them:
//!
//! - [`admin::AdminPrivilegeCoordinator`]: administrative-privilege
//!   lifecycle, consent flows, and token-correlated result delivery
//! - [`lock::KioskLockStateMachine`]: locked/unlocked and launcher
//!   preference transitions, gated by capability tier and privilege
//! - [`boot::BootPersistenceBridge`]: durable replay of boot signals that
//!   arrive before any application surface exists
//!
//! The platform itself sits behind the seams in [`platform`]; durable flags
//! behind [`flags::FlagStore`]. [`testing`] ships recording doubles for all
//! of them.
//!
//! ```text
//! boot signal ──► BootPersistenceBridge ──► FlagStore
//!                                              │ cold start
//!                                              ▼
//!              AdminPrivilegeCoordinator::initialize
//!                                              │ BootResumeRequested
//!                                              ▼
//!              owning application ──► KioskLockStateMachine::lock(home)
//! ```

pub mod admin;
pub mod boot;
pub mod capability;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod flags;
pub mod lock;
pub mod platform;
pub mod testing;

pub use admin::{AdminPrivilegeCoordinator, AdminSession, ConsentToken, PrivilegeCallback};
pub use boot::BootPersistenceBridge;
pub use capability::{CapabilityTier, GatedOperation};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AgentConfig, ConfigError};
pub use error::PolicyError;
pub use events::{AgentEvent, EventSink, NoopEventSink};
pub use flags::{
    FlagStore, FlagStoreError, InMemoryFlagStore, KEY_BOOT_REPLAY_PENDING, KEY_PROVISIONED,
    KEY_RELOCK_AT_BOOT,
};
pub use lock::{KioskLockStateMachine, LauncherPreference, LockProgress, LockState};
pub use platform::{
    CommandChannel, ComponentState, ForegroundSurface, IntentCategory, LauncherControl,
    PrivilegeBackend,
};
