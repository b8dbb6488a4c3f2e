//! Channel state.
//!
//! - [`channel`]: one channel and the engines that mutate it (mode, SJOIN)
//! - [`registry`]: the process-wide channel map and every public operation
//! - [`client`]: the client directory the engine resolves identities from
//! - [`observer`]: outbound events

pub mod channel;
pub mod client;
pub mod clock;
pub mod observer;
pub mod registry;
mod uid;

pub use channel::{Actor, Channel, Tier, Topic};
pub use client::{Client, ClientTable, Origin};
pub use clock::{Clock, ManualClock, SystemClock};
pub use observer::{ChannelEvent, ChannelObserver, EventLog, LeaveReason, TracingObserver};
pub use registry::{ChannelRegistry, JoinOutcome, VchanInfo, spawn_reaper};
pub use uid::{Uid, UidGenerator};
