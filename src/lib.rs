pub mod config;
pub mod error;
pub mod merge;
pub mod parse;
pub mod pipeline;
pub mod rank;
pub mod record;
pub mod report;
pub mod table;
pub mod translate;

pub use error::PipelineError;
pub use record::TradeRecord;
pub use report::{PipelineObserver, SilentObserver, TracingObserver};
pub use table::Table;
