//! slircd-chanstate - channel state engine for the Straylight IRC daemon.
//!
//! Channel membership, channel modes, SJOIN timestamp reconciliation and
//! the virtual-channel overlay. Protocol parsing and socket I/O live
//! elsewhere: callers hand in parsed requests and receive
//! [`state::ChannelEvent`]s back through a [`state::ChannelObserver`].

pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;
pub mod util;

pub use config::Config;
pub use error::{ChannelError, ChannelResult};
pub use state::{ChannelRegistry, ClientTable};
