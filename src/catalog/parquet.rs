//! Bridge from Parquet footers to catalog blocks.
//!
//! Metadata loaders that hold real Parquet footers can use this to populate
//! a [`BlockCatalog`](super::BlockCatalog) without decoding statistics
//! themselves. Conversion is restricted to physical statistics types;
//! loaders that need logical-type fidelity (dates, decimals, Int96
//! timestamps) construct [`BlockMeta`] directly.

use std::collections::HashMap;

use datafusion_common::ScalarValue;
use parquet::file::metadata::{ParquetMetaData, RowGroupMetaData};
use parquet::file::statistics::Statistics;

use super::{BlockMeta, ColumnStats};

/// Convert one file's Parquet metadata into catalog blocks, one per row
/// group, in file order.
pub fn blocks_from_metadata(relative_path: &str, metadata: &ParquetMetaData) -> Vec<BlockMeta> {
    metadata
        .row_groups()
        .iter()
        .map(|row_group| block_from_row_group(relative_path, row_group))
        .collect()
}

fn block_from_row_group(relative_path: &str, row_group: &RowGroupMetaData) -> BlockMeta {
    // Dictionary pages (if present) come before data pages; the block
    // starts at the earliest page of any of its column chunks.
    let starting_offset = row_group
        .columns()
        .iter()
        .map(|column| match column.dictionary_page_offset() {
            Some(dict) => dict.min(column.data_page_offset()),
            None => column.data_page_offset(),
        })
        .min()
        .unwrap_or(0)
        .max(0) as u64;

    let mut column_stats = HashMap::new();
    for column in row_group.columns() {
        let name = column.column_path().string();
        let bounds = column.statistics().and_then(stats_to_scalars);
        let (min, max) = match bounds {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };
        let null_count = column.statistics().and_then(|stats| stats.null_count_opt());
        column_stats.insert(name, ColumnStats::new(min, max, null_count));
    }

    BlockMeta {
        relative_path: relative_path.to_string(),
        starting_offset,
        compressed_length: row_group.compressed_size().max(0) as u64,
        row_count: row_group.num_rows().max(0) as u64,
        column_stats,
    }
}

/// Lift physical min/max statistics into scalar bounds.
///
/// Byte arrays are exposed as UTF-8 only when both bounds decode cleanly;
/// everything else (Int96, fixed-length byte arrays) is left without bounds
/// rather than guessed at.
fn stats_to_scalars(stats: &Statistics) -> Option<(ScalarValue, ScalarValue)> {
    match stats {
        Statistics::Boolean(stats) => {
            let min = stats.min_opt().copied()?;
            let max = stats.max_opt().copied()?;
            Some((
                ScalarValue::Boolean(Some(min)),
                ScalarValue::Boolean(Some(max)),
            ))
        }
        Statistics::Int32(stats) => {
            let min = stats.min_opt().copied()?;
            let max = stats.max_opt().copied()?;
            Some((ScalarValue::Int32(Some(min)), ScalarValue::Int32(Some(max))))
        }
        Statistics::Int64(stats) => {
            let min = stats.min_opt().copied()?;
            let max = stats.max_opt().copied()?;
            Some((ScalarValue::Int64(Some(min)), ScalarValue::Int64(Some(max))))
        }
        Statistics::Float(stats) => {
            let min = stats.min_opt().copied()?;
            let max = stats.max_opt().copied()?;
            Some((
                ScalarValue::Float32(Some(min)),
                ScalarValue::Float32(Some(max)),
            ))
        }
        Statistics::Double(stats) => {
            let min = stats.min_opt().copied()?;
            let max = stats.max_opt().copied()?;
            Some((
                ScalarValue::Float64(Some(min)),
                ScalarValue::Float64(Some(max)),
            ))
        }
        Statistics::ByteArray(stats) => {
            let min = std::str::from_utf8(stats.min_opt()?.data()).ok()?;
            let max = std::str::from_utf8(stats.max_opt()?.data()).ok()?;
            Some((
                ScalarValue::Utf8(Some(min.to_string())),
                ScalarValue::Utf8(Some(max.to_string())),
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use parquet::data_type::ByteArray;

    use super::*;

    #[test]
    fn converts_int32_bounds() {
        let stats = Statistics::int32(Some(1), Some(9), None, Some(0), false);
        assert_eq!(
            stats_to_scalars(&stats),
            Some((ScalarValue::Int32(Some(1)), ScalarValue::Int32(Some(9))))
        );
    }

    #[test]
    fn converts_utf8_bounds() {
        let stats = Statistics::byte_array(
            Some(ByteArray::from("apple")),
            Some(ByteArray::from("pear")),
            None,
            None,
            false,
        );
        assert_eq!(
            stats_to_scalars(&stats),
            Some((
                ScalarValue::Utf8(Some("apple".to_string())),
                ScalarValue::Utf8(Some("pear".to_string()))
            ))
        );
    }

    #[test]
    fn missing_bounds_convert_to_none() {
        let stats = Statistics::int64(None, None, None, Some(3), false);
        assert_eq!(stats_to_scalars(&stats), None);
    }

    #[test]
    fn non_utf8_byte_arrays_are_skipped() {
        let stats = Statistics::byte_array(
            Some(ByteArray::from(vec![0xffu8, 0xfe])),
            Some(ByteArray::from(vec![0xffu8, 0xff])),
            None,
            None,
            false,
        );
        assert_eq!(stats_to_scalars(&stats), None);
    }
}
