pub mod batch;
pub mod error;
pub mod ops;
pub mod pipeline;
pub mod props;
pub mod selector;
pub mod utils;

pub use batch::{select_batch, select_sample, validate_batch, SelectionResult, TopkTokensBatch};
pub use error::Error;
pub use ops::TopKTokenAxisOp;
pub use pipeline::{topk_tokens, TopkTokensOptions, TopkTokensPipeline};
pub use props::TopkTokensProps;
pub use selector::select;

/// A type alias for `Result<T, Error>` for the `topk-tokens` crate.
pub type Result<T> = std::result::Result<T, Error>;
