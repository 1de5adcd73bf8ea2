//! Change-stream reactor.
//!
//! Decodes change-feed records, diffs before/after images, and dispatches
//! per-entity-type side effects with per-record failure isolation.

pub mod diff;
pub mod dispatcher;
pub mod notifier;
pub mod reactor;
pub mod record;

pub use diff::{diff, FieldChange, FieldDiff};
pub use dispatcher::{
    DispatchError, Dispatcher, EntityHandler, HandlerRegistry, ItemHandler, RecordOutcome,
};
pub use notifier::{LogNotifier, MockNotifier, Notice, Notifier, NotifyError};
pub use reactor::{BatchReactor, BatchSummary};
pub use record::{EventKind, StreamBatch, StreamPayload, StreamRecord};
