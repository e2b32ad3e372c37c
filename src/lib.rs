//! Predicate-cached split planning for Parquet datasets.
//!
//! Given an immutable [`BlockCatalog`] of row-group metadata for one dataset
//! root, a [`MetadataSplitter`] turns a set of pushdown predicates into the
//! minimal byte-range [`Split`]s that could contain matching rows. Two
//! filtering tiers keep repeated queries cheap: predicates seen before are
//! answered from a [`BitmapCache`] of matching block ordinals, and unseen
//! predicates fall back to min/max statistics filtering while their bitmaps
//! are built on a background worker.
//!
//! Filtering is always conservative: anything the statistics cannot prove
//! keeps the block, and a file the catalog does not know degrades to a
//! whole-file split. The planner can filter less aggressively, never
//! incorrectly.

mod cache;
mod catalog;
mod error;
mod expr;
mod filter;
mod options;
mod splitter;
mod translate;

pub use cache::{BitmapCache, Clock, PredicateKey, SystemClock};
pub use catalog::parquet::blocks_from_metadata;
pub use catalog::{BlockCatalog, BlockMeta, ColumnStats};
pub use error::TurnstileError;
pub use expr::{CmpOp, Expr, TriState};
pub use filter::can_exclude;
pub use options::{SplitterOptions, SplitterOptionsBuilder};
pub use splitter::{
    FileStatus, MetadataSplitter, Split, SplitPlan, Splitter, WholeFileSplitter,
};
pub use translate::{ExprTranslator, PredicateTranslator};
