pub mod repository;
pub mod run_recorder;
pub mod store;

pub use repository::GraphRepository;
pub use run_recorder::{RunMetadata, RunRecorder};
pub use store::TieredStore;
