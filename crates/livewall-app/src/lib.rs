//! livewall-app - Renderer supervision and orchestration
//!
//! Implements the supervisor state machine, the window ownership bridge, the
//! Engine control loop, configuration loading, config file watching and OS
//! signal handling.

pub mod bridge;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod message;
pub mod signals;
pub mod spawn;
pub mod supervisor;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod timer;
pub mod watcher;

// Re-export primary types
pub use bridge::{WindowOwnershipBridge, WindowOwnershipView};
pub use collaborators::{NoShellOverride, NoWindowEmulation, ShellOverride, WindowEmulation};
pub use engine::{Engine, HostBindings, SHUTDOWN_TIMEOUT};
pub use message::Message;
pub use spawn::{OsSpawner, SpawnRequest, Spawner};
pub use supervisor::{Phase, RendererSupervisor, SupervisorConfig, SupervisorStatus};
pub use timer::{RestartTimer, TimerId, TokioRestartTimer};
pub use watcher::ConfigWatcher;
