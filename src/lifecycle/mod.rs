//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Tracker → Reporters (signal, interval) → Admin endpoint
//!
//! Signals (signals.rs):
//!     SIGUSR1 / SIGUSR2 / SIGINFO → report trigger
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → Reporters and admin endpoint exit → tasks joined
//! ```
//!
//! # Design Decisions
//! - Ordered startup: tracker first, then triggers, then listeners
//! - Shutdown consumes the running handle, so it happens once

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, Running, StartupError};
