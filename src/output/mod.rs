pub mod emitter;
pub mod snapshot;
pub mod summary;
pub mod syslog;

pub use emitter::Emitter;
pub use snapshot::SnapshotWriter;
pub use summary::SummarySink;
pub use syslog::{Severity, Syslog};
