mod error;
mod extractor;
pub mod strategy;
mod target;
pub mod writer;

pub use error::{StrategyError, TargetError};
pub use extractor::SelectorExtractor;
pub use strategy::{BodyFallback, BodyRule, Strategy, TitleRule};
pub use target::{OutputConfig, TargetConfig};
pub use writer::{batch_to_json, record_to_json, JsonBatchWriter, RecordKeys};

pub use harvest_crawler;
