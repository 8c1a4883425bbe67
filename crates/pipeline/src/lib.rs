//! Resumable batch importer.
//!
//! Commits the operator's selected rows one at a time through a
//! caller-supplied [`BatchInserter`] and honours a cooperative
//! [`CancelFlag`] at row boundaries. A paused batch can be resumed, kept or
//! discarded.
//!
//! - [`session`]: the `Idle → Running → {Paused | Completed}` state machine.
//! - [`flow`]: file, preview and selection orchestration around a session.
//! - [`sink`]: the insert/delete capability and its sequential contract.
//! - [`memory`]: an in-process sink for dry runs.

pub mod cancel;
pub mod flow;
pub mod memory;
pub mod session;
pub mod sink;

pub use cancel::CancelFlag;
pub use flow::{FlowError, FlowStage, ImportFlow};
pub use memory::MemorySink;
pub use session::{ImportSession, RunPlan, SessionError, SessionSnapshot, SessionState};
pub use sink::{BatchFailure, BatchInserter, SinkError};
