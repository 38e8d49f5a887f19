pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod model;
pub mod storage;

pub use config::Config;
pub use crawl::{CrawlReport, Crawler};
pub use error::{FollowgraphError, Result};
pub use model::{Profile, Relation, RelationType, Relationship};
pub use storage::{GraphRepository, RunRecorder, TieredStore};
