pub mod comparator;
pub mod engine;
pub mod hasher;
pub mod reporter;

pub use comparator::{ActionSummary, CopyKind, FileComparator, SyncAction};
pub use engine::{SyncConfig, SyncEngine, SyncReport, SyncStatus, SyncTarget};
pub use hasher::{hash_reader, DirectorySnapshot, FileDigest, TreeHasher, DEFAULT_CHUNK_SIZE};
pub use reporter::{EventKind, EventLevel, MemoryReporter, Reporter, SyncEvent, TracingReporter};
