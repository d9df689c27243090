pub mod desk;
pub mod doubles;

pub use desk::{TestDesk, COLLECTION, PUBLIC_BASE};
pub use doubles::{FlakyBlobStore, FlakyStore, Hold, RecordingNotifier, ScriptedGate, StoreFailure};
