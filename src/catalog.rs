use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arrow_schema::{Schema, SchemaRef};
use datafusion_common::ScalarValue;

use crate::error::TurnstileError;

pub(crate) mod parquet;

/// Min/max/null-count statistics for one column of one block.
///
/// Bounds are absent when the writer recorded no usable statistics for the
/// column (or every value is null); absent bounds never exclude anything.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnStats {
    pub min: Option<ScalarValue>,
    pub max: Option<ScalarValue>,
    pub null_count: Option<u64>,
}

impl ColumnStats {
    pub fn new(
        min: Option<ScalarValue>,
        max: Option<ScalarValue>,
        null_count: Option<u64>,
    ) -> Self {
        Self {
            min,
            max,
            null_count,
        }
    }
}

/// Metadata for one contiguous block (row group) of a columnar file.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockMeta {
    /// Path of the file holding this block, relative to the catalog root.
    pub relative_path: String,
    /// Byte offset of the block within its file.
    pub starting_offset: u64,
    /// Compressed length of the block in bytes.
    pub compressed_length: u64,
    /// Number of rows in the block.
    pub row_count: u64,
    /// Per-column statistics, keyed by column name.
    pub column_stats: HashMap<String, ColumnStats>,
}

/// Immutable catalog of every block under one dataset root.
///
/// A block's position in the catalog list is its ordinal index: the sole
/// identity bitmaps are built over. Ordinals are stable for the lifetime of
/// one catalog instance, so bitmaps computed against one instance must never
/// be applied to another.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use arrow_schema::{DataType, Field, Schema};
/// use turnstile::{BlockCatalog, BlockMeta};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
/// let blocks = vec![BlockMeta {
///     relative_path: "part-0.parquet".to_string(),
///     starting_offset: 4,
///     compressed_length: 1024,
///     row_count: 100,
///     column_stats: Default::default(),
/// }];
///
/// let catalog = BlockCatalog::try_new("/data/events", schema, blocks)?;
/// assert!(catalog.is_referenced("part-0.parquet"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BlockCatalog {
    root: String,
    schema: SchemaRef,
    blocks: Arc<[BlockMeta]>,
    referenced: Arc<HashSet<String>>,
}

impl BlockCatalog {
    /// Builds a catalog from the ordered block list of one dataset root.
    ///
    /// Block order must match on-disk physical order; it becomes the ordinal
    /// order of every split plan produced against this catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema has no fields, or if there are more
    /// blocks than a `u32` bitmap ordinal can address.
    pub fn try_new(
        root: impl Into<String>,
        schema: SchemaRef,
        blocks: Vec<BlockMeta>,
    ) -> Result<Self, TurnstileError> {
        if schema.fields().is_empty() {
            return Err(TurnstileError::EmptySchema);
        }
        if blocks.len() > u32::MAX as usize {
            return Err(TurnstileError::TooManyBlocks {
                count: blocks.len(),
            });
        }
        let referenced = blocks
            .iter()
            .map(|block| block.relative_path.clone())
            .collect::<HashSet<_>>();
        Ok(Self {
            root: root.into(),
            schema,
            blocks: blocks.into(),
            referenced: Arc::new(referenced),
        })
    }

    /// Root path this catalog indexes.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Dataset schema descriptor.
    pub fn schema(&self) -> &Schema {
        self.schema.as_ref()
    }

    /// Blocks in ordinal order.
    pub fn blocks(&self) -> &[BlockMeta] {
        &self.blocks
    }

    /// Number of blocks in the catalog.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether `path` belongs to the referenced file set, i.e. at least one
    /// catalog block lives in it. Files outside the set cannot be filtered
    /// and degrade to whole-file splits.
    pub fn is_referenced(&self, path: &str) -> bool {
        self.referenced.contains(path)
    }

    /// Shared handle to the block list, for handing to background builds.
    pub fn shared_blocks(&self) -> Arc<[BlockMeta]> {
        self.blocks.clone()
    }

    pub(crate) fn shared_referenced(&self) -> Arc<HashSet<String>> {
        self.referenced.clone()
    }
}
