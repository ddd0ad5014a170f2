// In: src/bridge/arrow_impl.rs

//! Marshals Arrow arrays into the engine's TaggedStream representation.

use arrow::array::{
    Array, BinaryArray, BooleanArray, FixedSizeBinaryArray, LargeBinaryArray, LargeStringArray,
    PrimitiveArray, StringArray,
};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};

use crate::error::tambakError;
use crate::types::TaggedStream;

fn downcast<'a, A: 'static>(array: &'a dyn Array) -> Result<&'a A, tambakError> {
    array.as_any().downcast_ref::<A>().ok_or_else(|| {
        tambakError::InternalError(format!(
            "Array of type {} failed to downcast",
            array.data_type()
        ))
    })
}

/// Collects length-delimited values into a String stream.
fn strings_from_values<'a>(
    values: impl Iterator<Item = &'a [u8]>,
) -> Result<TaggedStream, tambakError> {
    let mut content = Vec::new();
    let mut lens = Vec::new();
    for value in values {
        let len = u32::try_from(value.len()).map_err(|_| {
            tambakError::UnsupportedType(format!("Value of {} bytes is too long", value.len()))
        })?;
        content.extend_from_slice(value);
        lens.push(len);
    }
    TaggedStream::strings(content, lens)
}

/// Converts one null-free Arrow array into an untagged TaggedStream.
pub(crate) fn array_to_tagged_stream(array: &dyn Array) -> Result<TaggedStream, tambakError> {
    if array.null_count() > 0 {
        return Err(tambakError::UnsupportedType(format!(
            "Column of type {} holds {} null(s); nullable columns are not routed",
            array.data_type(),
            array.null_count()
        )));
    }

    macro_rules! numeric_stream {
        ($T:ty) => {{
            let primitive_array = downcast::<PrimitiveArray<$T>>(array)?;
            TaggedStream::numeric_from_slice(&primitive_array.values()[..])
        }};
    }

    match array.data_type() {
        DataType::Int8 => numeric_stream!(Int8Type),
        DataType::Int16 => numeric_stream!(Int16Type),
        DataType::Int32 => numeric_stream!(Int32Type),
        DataType::Int64 => numeric_stream!(Int64Type),
        DataType::UInt8 => numeric_stream!(UInt8Type),
        DataType::UInt16 => numeric_stream!(UInt16Type),
        DataType::UInt32 => numeric_stream!(UInt32Type),
        DataType::UInt64 => numeric_stream!(UInt64Type),
        DataType::Float32 => numeric_stream!(Float32Type),
        DataType::Float64 => numeric_stream!(Float64Type),
        DataType::Boolean => {
            let bool_array = downcast::<BooleanArray>(array)?;
            let bytes: Vec<u8> = (0..bool_array.len())
                .map(|i| bool_array.value(i) as u8)
                .collect();
            TaggedStream::numeric(1, bytes)
        }
        DataType::FixedSizeBinary(width) => {
            let binary_array = downcast::<FixedSizeBinaryArray>(array)?;
            let width = usize::try_from(*width).map_err(|_| {
                tambakError::UnsupportedType(format!("FixedSizeBinary width {}", width))
            })?;
            let mut bytes = Vec::with_capacity(width * binary_array.len());
            for i in 0..binary_array.len() {
                bytes.extend_from_slice(binary_array.value(i));
            }
            TaggedStream::structs(width, bytes)
        }
        DataType::Utf8 => {
            let a = downcast::<StringArray>(array)?;
            strings_from_values((0..a.len()).map(|i| a.value(i).as_bytes()))
        }
        DataType::LargeUtf8 => {
            let a = downcast::<LargeStringArray>(array)?;
            strings_from_values((0..a.len()).map(|i| a.value(i).as_bytes()))
        }
        DataType::Binary => {
            let a = downcast::<BinaryArray>(array)?;
            strings_from_values((0..a.len()).map(|i| a.value(i)))
        }
        DataType::LargeBinary => {
            let a = downcast::<LargeBinaryArray>(array)?;
            strings_from_values((0..a.len()).map(|i| a.value(i)))
        }
        dt => Err(tambakError::UnsupportedType(format!(
            "Unsupported column type for routing: {}",
            dt
        ))),
    }
}
