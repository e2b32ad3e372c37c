use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{BitmapCache, PredicateKey};
use crate::catalog::BlockCatalog;
use crate::error::TurnstileError;
use crate::expr::Expr;
use crate::filter;
use crate::options::SplitterOptions;
use crate::translate::PredicateTranslator;

/// A byte range within one file, designated for a single read task.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Split {
    pub path: String,
    pub offset: u64,
    pub length: u64,
}

impl Split {
    fn whole_file(file: &FileStatus) -> Self {
        Split {
            path: file.path.clone(),
            offset: 0,
            length: file.length,
        }
    }
}

/// Path and length of a file, as reported by the surrounding scheduler.
///
/// The path is expected in the same form as the catalog's block paths,
/// relative to the catalog root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileStatus {
    pub path: String,
    pub length: u64,
}

impl FileStatus {
    pub fn new(path: impl Into<String>, length: u64) -> Self {
        Self {
            path: path.into(),
            length,
        }
    }
}

/// Planned splits for one predicate set, applied once per file.
#[derive(Clone, Debug)]
pub struct SplitPlan {
    inner: PlanInner,
}

#[derive(Clone, Debug)]
enum PlanInner {
    /// Degraded mode: one split spanning each whole file.
    WholeFile,
    /// Splits grouped by file path over the surviving catalog blocks.
    Filtered {
        by_path: HashMap<String, Vec<Split>>,
        referenced: Arc<HashSet<String>>,
    },
}

impl SplitPlan {
    fn whole_file() -> Self {
        Self {
            inner: PlanInner::WholeFile,
        }
    }

    fn filtered(by_path: HashMap<String, Vec<Split>>, referenced: Arc<HashSet<String>>) -> Self {
        Self {
            inner: PlanInner::Filtered { by_path, referenced },
        }
    }

    /// Splits to read for `file`.
    ///
    /// A path the block catalog never referenced cannot be filtered and
    /// degrades to a single whole-file split. That is metadata/data drift,
    /// not an error, and is surfaced as a warning so operators can spot it.
    pub fn splits_for(&self, file: &FileStatus) -> Vec<Split> {
        match &self.inner {
            PlanInner::WholeFile => vec![Split::whole_file(file)],
            PlanInner::Filtered { by_path, referenced } => {
                if !referenced.contains(&file.path) {
                    warn!(
                        path = %file.path,
                        "file not present in block catalog, skipping filters"
                    );
                    return vec![Split::whole_file(file)];
                }
                by_path.get(&file.path).cloned().unwrap_or_default()
            }
        }
    }
}

/// Turns a predicate set into a per-file split plan.
pub trait Splitter<P> {
    fn plan(&self, predicates: &[P]) -> SplitPlan;
}

/// No-metadata splitter: ignores predicates and reads every file as one
/// whole-file split. The degraded mode for datasets without a block catalog.
#[derive(Clone, Copy, Debug, Default)]
pub struct WholeFileSplitter;

impl<P> Splitter<P> for WholeFileSplitter {
    fn plan(&self, _predicates: &[P]) -> SplitPlan {
        SplitPlan::whole_file()
    }
}

/// Predicate-pushdown split planner over a fixed [`BlockCatalog`].
///
/// Predicates already cached are answered by intersecting their bitmaps;
/// the rest fall back to inline statistics filtering while their bitmaps
/// are built in the background, so the next query with the same predicate
/// skips both the translation and the full-block scan. The cache is scoped
/// to this splitter instance; bitmaps never outlive the catalog whose
/// ordinals they index.
///
/// # Thread Safety
///
/// `MetadataSplitter` is `Send` and `Sync` (given a `Send + Sync`
/// translator) and can be shared across query threads via `Arc`; planning
/// takes `&self`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use arrow_schema::{DataType, Field, Schema};
/// use datafusion_common::ScalarValue;
/// use turnstile::{
///     BlockCatalog, BlockMeta, Expr, ExprTranslator, FileStatus, MetadataSplitter, Splitter,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int32, false)]));
/// let blocks = vec![BlockMeta {
///     relative_path: "part-0.parquet".to_string(),
///     starting_offset: 4,
///     compressed_length: 1024,
///     row_count: 100,
///     column_stats: Default::default(),
/// }];
/// let catalog = BlockCatalog::try_new("/data/events", schema, blocks)?;
///
/// let splitter = MetadataSplitter::try_new(catalog, ExprTranslator)?;
/// let plan = splitter.plan(&[Expr::gt("v", ScalarValue::Int32(Some(17)))]);
///
/// let splits = plan.splits_for(&FileStatus::new("part-0.parquet", 1100));
/// assert_eq!(splits.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MetadataSplitter<P: PredicateKey, T> {
    catalog: BlockCatalog,
    cache: BitmapCache<P>,
    translator: T,
}

impl<P: PredicateKey, T: PredicateTranslator<P>> MetadataSplitter<P, T> {
    /// Creates a splitter with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the background build worker cannot be started.
    pub fn try_new(catalog: BlockCatalog, translator: T) -> Result<Self, TurnstileError> {
        Self::try_with_options(catalog, translator, SplitterOptions::default())
    }

    /// Creates a splitter with explicit options.
    pub fn try_with_options(
        catalog: BlockCatalog,
        translator: T,
        options: SplitterOptions,
    ) -> Result<Self, TurnstileError> {
        let cache = BitmapCache::try_new(options.idle_ttl(), options.build_queue_capacity())?;
        Ok(Self {
            catalog,
            cache,
            translator,
        })
    }

    /// The catalog this splitter plans over.
    pub fn catalog(&self) -> &BlockCatalog {
        &self.catalog
    }

    /// The bitmap cache backing this splitter.
    pub fn cache(&self) -> &BitmapCache<P> {
        &self.cache
    }
}

impl<P: PredicateKey, T: PredicateTranslator<P>> Splitter<P> for MetadataSplitter<P, T> {
    fn plan(&self, predicates: &[P]) -> SplitPlan {
        let schema = self.catalog.schema();

        // Untranslatable predicates cannot be checked against statistics;
        // they drop out of filtering and caching for this call.
        let translated: Vec<(P, Expr)> = predicates
            .iter()
            .filter_map(|predicate| {
                self.translator
                    .translate(predicate, schema)
                    .map(|expr| (predicate.clone(), expr))
            })
            .collect();

        let cached = self
            .cache
            .lookup_many(translated.iter().map(|(predicate, _)| predicate));
        let uncached: Vec<(P, Expr)> = translated
            .into_iter()
            .filter(|(predicate, _)| !cached.contains_key(predicate))
            .collect();
        debug!(
            cached = cached.len(),
            uncached = uncached.len(),
            "partitioned predicates"
        );

        // Logical AND over the cached index sets. None means no predicate
        // was cached and every block stays in the working set.
        let working = cached.into_values().reduce(|mut acc, bitmap| {
            acc &= bitmap;
            acc
        });

        let mut by_path: HashMap<String, Vec<Split>> = HashMap::new();
        for (ordinal, block) in self.catalog.blocks().iter().enumerate() {
            if let Some(bitmap) = &working {
                if !bitmap.contains(ordinal as u32) {
                    continue;
                }
            }
            if uncached
                .iter()
                .any(|(_, expr)| filter::can_exclude(expr, block))
            {
                continue;
            }
            by_path
                .entry(block.relative_path.clone())
                .or_default()
                .push(Split {
                    path: block.relative_path.clone(),
                    offset: block.starting_offset,
                    length: block.compressed_length,
                });
        }

        // Populate bitmaps for the predicates filtered inline above, so the
        // next query with the same predicate skips the scan. Never blocks.
        self.cache
            .schedule_build(uncached, self.catalog.shared_blocks());

        SplitPlan::filtered(by_path, self.catalog.shared_referenced())
    }
}
