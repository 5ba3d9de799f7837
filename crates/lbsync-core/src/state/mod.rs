// # State Stores
//
// Host-side persistence of the last known load balancer configuration:
// an in-memory map for tests and one-shot runs, and a crash-safe JSON file.

pub mod file;
pub mod memory;

pub use file::{FileStateStore, FileStateStoreFactory};
pub use memory::{MemoryStateStore, MemoryStateStoreFactory};
