use std::sync::Arc;

use arrow_array::{Int32Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use bytes::Bytes;
use datafusion_common::ScalarValue;
use parquet::arrow::ArrowWriter;
use parquet::file::metadata::{ParquetMetaData, ParquetMetaDataReader};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use turnstile::{
    BlockCatalog, ColumnStats, Expr, ExprTranslator, FileStatus, MetadataSplitter, Splitter,
    blocks_from_metadata,
};

fn make_batch(schema: &Schema, values: &[i32]) -> RecordBatch {
    let array = Int32Array::from(values.to_vec());
    RecordBatch::try_new(Arc::new(schema.clone()), vec![Arc::new(array)]).unwrap()
}

fn write_parquet(batches: &[RecordBatch], props: WriterProperties) -> Vec<u8> {
    let mut buffer: Vec<u8> = Vec::new();
    let schema = batches[0].schema();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, Some(props)).unwrap();
    for batch in batches {
        writer.write(batch).unwrap();
    }
    writer.close().unwrap();
    buffer
}

fn load_metadata(bytes: &[u8]) -> ParquetMetaData {
    let bytes = Bytes::copy_from_slice(bytes);
    ParquetMetaDataReader::new().parse_and_finish(&bytes).unwrap()
}

fn two_row_group_metadata() -> ParquetMetaData {
    let schema = Schema::new(vec![Field::new("a", DataType::Int32, false)]);
    let batch1 = make_batch(&schema, &[1, 2, 3, 4, 5]);
    let batch2 = make_batch(&schema, &[10, 11, 12, 13, 14]);

    let props = WriterProperties::builder()
        .set_statistics_enabled(EnabledStatistics::Chunk)
        .set_max_row_group_size(5)
        .build();

    let bytes = write_parquet(&[batch1, batch2], props);
    load_metadata(&bytes)
}

#[test]
fn footer_row_groups_become_catalog_blocks() {
    let metadata = two_row_group_metadata();
    let blocks = blocks_from_metadata("users.parquet", &metadata);

    assert_eq!(blocks.len(), 2);
    for block in &blocks {
        assert_eq!(block.relative_path, "users.parquet");
        assert_eq!(block.row_count, 5);
        assert!(block.compressed_length > 0);
    }
    // Physical order: the second row group starts after the first.
    assert!(blocks[1].starting_offset > blocks[0].starting_offset);

    assert_eq!(
        blocks[0].column_stats.get("a"),
        Some(&ColumnStats::new(
            Some(ScalarValue::Int32(Some(1))),
            Some(ScalarValue::Int32(Some(5))),
            Some(0),
        ))
    );
    assert_eq!(
        blocks[1].column_stats.get("a"),
        Some(&ColumnStats::new(
            Some(ScalarValue::Int32(Some(10))),
            Some(ScalarValue::Int32(Some(14))),
            Some(0),
        ))
    );
}

#[test]
fn footer_backed_catalog_prunes_row_groups() {
    let metadata = two_row_group_metadata();
    let blocks = blocks_from_metadata("users.parquet", &metadata);
    let expected_offset = blocks[1].starting_offset;
    let expected_length = blocks[1].compressed_length;

    let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int32, false)]));
    let catalog = BlockCatalog::try_new("/data/users", schema, blocks).unwrap();
    let splitter = MetadataSplitter::try_new(catalog, ExprTranslator).unwrap();

    let plan = splitter.plan(&[Expr::gt("a", ScalarValue::Int32(Some(9)))]);
    let splits = plan.splits_for(&FileStatus::new("users.parquet", 4096));

    assert_eq!(splits.len(), 1);
    assert_eq!(splits[0].offset, expected_offset);
    assert_eq!(splits[0].length, expected_length);
}

#[test]
fn catalog_from_multiple_files_keeps_file_identity() {
    let metadata = two_row_group_metadata();
    let mut blocks = blocks_from_metadata("day=1/part-0.parquet", &metadata);
    blocks.extend(blocks_from_metadata("day=2/part-0.parquet", &metadata));

    let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int32, false)]));
    let catalog = BlockCatalog::try_new("/data/users", schema, blocks).unwrap();
    assert!(catalog.is_referenced("day=1/part-0.parquet"));
    assert!(catalog.is_referenced("day=2/part-0.parquet"));
    assert!(!catalog.is_referenced("day=3/part-0.parquet"));
    assert_eq!(catalog.len(), 4);
}
