//! msgsift: decode message archive payloads and reconstruct game sessions.
//!
//! A batch of message rows goes through three stages:
//!
//! - [`archive`] decodes the binary blobs attached to a message (typed stream
//!   rich-text bodies and keyed-archive interactive payloads);
//! - [`extract`] reduces a decoded payload to its content tokens;
//! - [`session`] groups rows by correlation id and resolves each group into a
//!   [`GameSession`], which [`assemble`] turns into a persistable record.

pub mod archive;
pub mod assemble;
pub mod bodies;
pub mod cli;
pub mod config;
pub mod events;
pub mod extract;
pub mod registry;
pub mod session;
pub mod store;

pub use config::Config;
pub use events::RawMessageEvent;
pub use session::{FailurePolicy, GameSession, Reconstructor, TerminationOutcome};
