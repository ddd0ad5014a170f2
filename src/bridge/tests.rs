use super::*;
use crate::config::{Cluster, ClusterConfig, GraphConfig, TypeDefault};
use crate::error::tambakError;
use crate::graph::{
    CodecRegistry, CompiledGraph, EntryId, GraphBuilder, NUMERIC_CONCAT, STRING_CONCAT,
    STRUCT_CONCAT,
};
use crate::kernels::{StoreSuccessor, ZstdSuccessor};
use crate::pipeline::Decompressed;
use crate::types::StreamType;
use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, FixedSizeBinaryArray, Float64Array, Int32Array,
    Int64Array, ListArray, StringArray,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

fn create_test_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("price", DataType::Float64, false),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("qty", DataType::Int32, false),
        Field::new("flag", DataType::Boolean, false),
        Field::new("uuid", DataType::FixedSizeBinary(4), false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![1, 2, 3])),
        Arc::new(Float64Array::from(vec![10.5, 11.0, 9.75])),
        Arc::new(StringArray::from(vec!["AAPL", "MSFT", "GOOG"])),
        Arc::new(Int32Array::from(vec![100, 250, 75])),
        Arc::new(BooleanArray::from(vec![true, false, true])),
        Arc::new(
            FixedSizeBinaryArray::try_from_iter(
                vec![b"abcd".to_vec(), b"efgh".to_vec(), b"ijkl".to_vec()].into_iter(),
            )
            .unwrap(),
        ),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

/// The 8-byte numeric columns share a cluster; everything else falls to defaults.
fn create_test_graph() -> CompiledGraph {
    let mut registry = CodecRegistry::with_standard_concat_codecs();
    registry.register_successor(StoreSuccessor);
    registry.register_successor(ZstdSuccessor::default());
    let clustering = ClusterConfig::new()
        .with_cluster(Cluster::new(vec![0, 1, 3], StreamType::Numeric, 1, NUMERIC_CONCAT).with_width(8))
        .with_type_default(TypeDefault::new(StreamType::Numeric, 0, NUMERIC_CONCAT).with_width(4))
        .with_type_default(TypeDefault::new(StreamType::Numeric, 0, NUMERIC_CONCAT).with_width(1))
        .with_type_default(TypeDefault::new(StreamType::String, 1, STRING_CONCAT))
        .with_type_default(TypeDefault::new(StreamType::Struct, 0, STRUCT_CONCAT));
    GraphBuilder::new(registry)
        .with_config(GraphConfig::new(clustering))
        .build()
        .unwrap()
}

/// Bridge errors arrive wrapped with the column they came from.
fn is_unsupported(err: &tambakError) -> bool {
    match err {
        tambakError::UnsupportedType(_) => true,
        tambakError::PipelineError { source, .. } => is_unsupported(source),
        _ => false,
    }
}

#[test]
fn test_columns_become_tagged_streams() {
    let streams = record_batch_to_tagged_streams(&create_test_batch()).unwrap();
    assert_eq!(streams.len(), 6);
    for (i, s) in streams.iter().enumerate() {
        assert_eq!(s.tag(), Some(i as i32));
        assert_eq!(s.num_elts(), 3);
    }
    assert_eq!(streams[0].stream_type(), StreamType::Numeric);
    assert_eq!(streams[0].width(), 8);
    assert_eq!(streams[2].stream_type(), StreamType::String);
    assert_eq!(streams[2].content(), b"AAPLMSFTGOOG");
    assert_eq!(streams[3].width(), 4);
    assert_eq!(streams[4].content(), &[1u8, 0, 1]);
    assert_eq!(streams[5].stream_type(), StreamType::Struct);
    assert_eq!(streams[5].width(), 4);
}

#[test]
fn test_binary_column_is_a_string_stream() {
    let schema = Arc::new(Schema::new(vec![Field::new("b", DataType::Binary, false)]));
    let values: Vec<&[u8]> = vec![b"\x00\x01", b"", b"\xff"];
    let batch =
        RecordBatch::try_new(schema, vec![Arc::new(BinaryArray::from(values)) as ArrayRef])
            .unwrap();
    let streams = record_batch_to_tagged_streams(&batch).unwrap();
    assert_eq!(streams[0].string_lens(), Some(&[2u32, 0, 1][..]));
}

#[test]
fn test_nullable_and_nested_columns_are_rejected() {
    let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int32, true)]));
    let batch = RecordBatch::try_new(
        schema,
        vec![Arc::new(Int32Array::from(vec![Some(1), None])) as ArrayRef],
    )
    .unwrap();
    let err = record_batch_to_tagged_streams(&batch).unwrap_err();
    assert!(is_unsupported(&err), "{:?}", err);

    let list = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![Some(vec![Some(1)])]);
    let schema = Arc::new(Schema::new(vec![Field::new(
        "l",
        list.data_type().clone(),
        false,
    )]));
    let batch = RecordBatch::try_new(schema, vec![Arc::new(list) as ArrayRef]).unwrap();
    let err = record_batch_to_tagged_streams(&batch).unwrap_err();
    assert!(is_unsupported(&err), "{:?}", err);
}

#[test]
fn test_compress_record_batch_and_analyze() {
    let graph = create_test_graph();
    let batch = create_test_batch();
    let bytes = compress_record_batch(&graph, &batch).unwrap();

    let stats = analyze_frame(&bytes).unwrap();
    assert_eq!(stats.total_size, bytes.len());
    assert_eq!(stats.header_size + stats.data_size, stats.total_size);
    assert_eq!(stats.source_kind, "streams");
    assert_eq!(stats.original_size, 6);

    let entries: Vec<EntryId> = stats.plan.groups.iter().map(|g| g.entry).collect();
    // qty (i32) is claimed by tag but misses the width-8 cluster.
    assert_eq!(
        entries,
        vec![
            EntryId::Cluster(0),
            EntryId::TypeDefault(0),
            EntryId::TypeDefault(1),
            EntryId::TypeDefault(2),
            EntryId::TypeDefault(3),
        ]
    );
    assert_eq!(stats.plan.groups[0].members.len(), 2);
    assert!(!stats.plan.groups[0].forwarded);
    assert_eq!(stats.plan.groups[1].members[0].stream_index, 3);
    assert_eq!(stats.nb_groups(), 5);
    assert!(stats.streams.iter().any(|(name, _)| name == "group.0.sizes"));

    let expected = record_batch_to_tagged_streams(&batch).unwrap();
    assert_eq!(graph.decompress(&bytes).unwrap(), Decompressed::Streams(expected));
}

#[test]
fn test_analyze_frame_rejects_garbage() {
    assert!(analyze_frame(b"not a frame at all, definitely").is_err());
}
