//! SQLite-backed event log for tether sessions.
//!
//! Every query typed at the prompt, every tool the model asked for, every tool
//! result and the final answer are appended here, so past sessions can be
//! listed and replayed with `tether sessions` / `tether logs`.
//!
//! # Core Concepts
//!
//! - [`EventStore`] wraps a SQLite database; events are append-only.
//! - [`Event`] is one entry: id, session, timestamp and an [`EventKind`].
//! - [`SessionId`] is a UUID; it displays and parses as a string so the CLI
//!   can match sessions by prefix.
//!
//! # Example
//!
//! ```no_run
//! use storage::{Event, EventKind, EventStore, Role, SessionId};
//!
//! let store = EventStore::open("events.db")?;
//!
//! let session_id = SessionId::new();
//! store.append(&Event::new(session_id, EventKind::SessionStart { server: "server.js".into() }))?;
//! store.append(&Event::message(session_id, Role::User, "What is 2+2?"))?;
//!
//! for event in store.load_session(session_id)? {
//!     println!("{}: {:?}", event.timestamp, event.kind);
//! }
//!
//! for summary in store.list_sessions()? {
//!     println!("{}: {} queries", summary.id, summary.query_count);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod event;
mod store;

pub use error::{Error, Result};
pub use event::{Event, EventKind, Role, SessionId};
pub use store::{EventStore, SessionSummary};
