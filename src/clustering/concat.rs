//! The built-in concat codecs, one per stream type plus an interleaving
//! variant for strings.
//!
//! Fixed-width codecs require every member to share one width. When an entry
//! declares its width this is already guaranteed by resolution; otherwise a
//! mismatch is reported here as invalid input.

use crate::error::tambakError;
use crate::traits::{ConcatCodec, ConcatOutput};
use crate::types::{StreamPayload, StreamType, TaggedStream};

//==================================================================================
// 1. Shared helpers
//==================================================================================

fn check_members(
    codec: &str,
    expected: StreamType,
    members: &[&TaggedStream],
) -> Result<usize, tambakError> {
    let first = members.first().ok_or_else(|| {
        tambakError::InvalidInput(format!("Concat codec '{}' called with no members", codec))
    })?;
    for (i, member) in members.iter().enumerate() {
        if member.stream_type() != expected {
            return Err(tambakError::InvalidInput(format!(
                "Concat codec '{}' expects {} streams, member {} is {}",
                codec,
                expected,
                i,
                member.type_width()
            )));
        }
        if member.width() != first.width() {
            return Err(tambakError::InvalidInput(format!(
                "Concat codec '{}' requires a uniform width: member 0 is {}, member {} is {}",
                codec,
                first.type_width(),
                i,
                member.type_width()
            )));
        }
    }
    Ok(first.width())
}

fn concat_fixed(
    codec: &str,
    expected: StreamType,
    members: &[&TaggedStream],
) -> Result<ConcatOutput, tambakError> {
    let width = check_members(codec, expected, members)?;
    let total: usize = members.iter().map(|m| m.content_size()).sum();
    let mut bytes = Vec::with_capacity(total);
    let mut member_sizes = Vec::with_capacity(members.len());
    for member in members {
        bytes.extend_from_slice(member.content());
        member_sizes.push(member.num_elts() as u64);
    }
    Ok(ConcatOutput {
        merged: TaggedStream::from_parts(expected, width, StreamPayload::Fixed(bytes))?,
        member_sizes,
    })
}

fn split_fixed(
    expected: StreamType,
    merged: &TaggedStream,
    member_sizes: &[u64],
) -> Result<Vec<TaggedStream>, tambakError> {
    if merged.stream_type() != expected {
        return Err(tambakError::Corruption(format!(
            "Cannot split a {} stream as {}",
            merged.type_width(),
            expected
        )));
    }
    let width = merged.width();
    let content = merged.content();
    let mut offset = 0usize;
    let mut parts = Vec::with_capacity(member_sizes.len());
    for (i, &count) in member_sizes.iter().enumerate() {
        let len = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(width))
            .ok_or_else(|| tambakError::Corruption(format!("Member {} size overflows", i)))?;
        let end = offset.checked_add(len);
        let bytes = end.and_then(|end| content.get(offset..end)).ok_or_else(|| {
            tambakError::Corruption(format!(
                "Member sizes exceed the merged stream at member {}",
                i
            ))
        })?;
        parts.push(TaggedStream::from_parts(
            expected,
            width,
            StreamPayload::Fixed(bytes.to_vec()),
        )?);
        offset += len;
    }
    if offset != content.len() {
        return Err(tambakError::Corruption(format!(
            "Member sizes cover {} of {} merged bytes",
            offset,
            content.len()
        )));
    }
    Ok(parts)
}

fn check_string_split<'a>(
    merged: &'a TaggedStream,
    member_sizes: &[u64],
) -> Result<Vec<&'a [u8]>, tambakError> {
    if merged.stream_type() != StreamType::String {
        return Err(tambakError::Corruption(format!(
            "Cannot split a {} stream as String",
            merged.type_width()
        )));
    }
    let declared = member_sizes
        .iter()
        .try_fold(0u64, |acc, &n| acc.checked_add(n))
        .ok_or_else(|| tambakError::Corruption("Member sizes overflow".to_string()))?;
    if declared != merged.num_elts() as u64 {
        return Err(tambakError::Corruption(format!(
            "Member sizes cover {} elements, merged stream holds {}",
            declared,
            merged.num_elts()
        )));
    }
    Ok(merged.elements().collect())
}

fn strings_from(elements: &[&[u8]]) -> Result<TaggedStream, tambakError> {
    let content = elements.concat();
    let lens = elements.iter().map(|e| e.len() as u32).collect();
    TaggedStream::strings(content, lens)
}

//==================================================================================
// 2. Fixed-width codecs
//==================================================================================

/// Byte-buffer append.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConcat;

impl ConcatCodec for SerialConcat {
    fn name(&self) -> &str {
        "serial"
    }

    fn accepts(&self, stream_type: StreamType) -> bool {
        stream_type == StreamType::Serial
    }

    fn concat(&self, members: &[&TaggedStream]) -> Result<ConcatOutput, tambakError> {
        concat_fixed(self.name(), StreamType::Serial, members)
    }

    fn split(
        &self,
        merged: &TaggedStream,
        member_sizes: &[u64],
    ) -> Result<Vec<TaggedStream>, tambakError> {
        split_fixed(StreamType::Serial, merged, member_sizes)
    }
}

/// Append of fixed-width record arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructConcat;

impl ConcatCodec for StructConcat {
    fn name(&self) -> &str {
        "struct"
    }

    fn accepts(&self, stream_type: StreamType) -> bool {
        stream_type == StreamType::Struct
    }

    fn concat(&self, members: &[&TaggedStream]) -> Result<ConcatOutput, tambakError> {
        concat_fixed(self.name(), StreamType::Struct, members)
    }

    fn split(
        &self,
        merged: &TaggedStream,
        member_sizes: &[u64],
    ) -> Result<Vec<TaggedStream>, tambakError> {
        split_fixed(StreamType::Struct, merged, member_sizes)
    }
}

/// Append of fixed-width numeric arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericConcat;

impl ConcatCodec for NumericConcat {
    fn name(&self) -> &str {
        "numeric"
    }

    fn accepts(&self, stream_type: StreamType) -> bool {
        stream_type == StreamType::Numeric
    }

    fn concat(&self, members: &[&TaggedStream]) -> Result<ConcatOutput, tambakError> {
        concat_fixed(self.name(), StreamType::Numeric, members)
    }

    fn split(
        &self,
        merged: &TaggedStream,
        member_sizes: &[u64],
    ) -> Result<Vec<TaggedStream>, tambakError> {
        split_fixed(StreamType::Numeric, merged, member_sizes)
    }
}

//==================================================================================
// 3. String codecs
//==================================================================================

/// Append of length-delimited elements, member after member.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConcat;

impl ConcatCodec for StringConcat {
    fn name(&self) -> &str {
        "string"
    }

    fn accepts(&self, stream_type: StreamType) -> bool {
        stream_type == StreamType::String
    }

    fn concat(&self, members: &[&TaggedStream]) -> Result<ConcatOutput, tambakError> {
        check_members(self.name(), StreamType::String, members)?;
        let mut content = Vec::with_capacity(members.iter().map(|m| m.content_size()).sum());
        let mut lens = Vec::with_capacity(members.iter().map(|m| m.num_elts()).sum());
        let mut member_sizes = Vec::with_capacity(members.len());
        for member in members {
            content.extend_from_slice(member.content());
            lens.extend_from_slice(member.string_lens().unwrap_or_default());
            member_sizes.push(member.num_elts() as u64);
        }
        Ok(ConcatOutput {
            merged: TaggedStream::strings(content, lens)?,
            member_sizes,
        })
    }

    fn split(
        &self,
        merged: &TaggedStream,
        member_sizes: &[u64],
    ) -> Result<Vec<TaggedStream>, tambakError> {
        let elements = check_string_split(merged, member_sizes)?;
        let mut start = 0usize;
        member_sizes
            .iter()
            .map(|&count| {
                let end = start + count as usize;
                let part = strings_from(&elements[start..end]);
                start = end;
                part
            })
            .collect()
    }
}

/// Round-robin merge of string elements: element 0 of every member, then
/// element 1 of every member still holding one, and so on.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringInterleaveConcat;

impl ConcatCodec for StringInterleaveConcat {
    fn name(&self) -> &str {
        "string_interleave"
    }

    fn accepts(&self, stream_type: StreamType) -> bool {
        stream_type == StreamType::String
    }

    fn concat(&self, members: &[&TaggedStream]) -> Result<ConcatOutput, tambakError> {
        check_members(self.name(), StreamType::String, members)?;
        let per_member: Vec<Vec<&[u8]>> = members.iter().map(|m| m.elements().collect()).collect();
        let rounds = per_member.iter().map(Vec::len).max().unwrap_or(0);

        let mut merged: Vec<&[u8]> = Vec::with_capacity(per_member.iter().map(Vec::len).sum());
        for round in 0..rounds {
            for elements in &per_member {
                if let Some(&element) = elements.get(round) {
                    merged.push(element);
                }
            }
        }

        Ok(ConcatOutput {
            merged: strings_from(&merged)?,
            member_sizes: per_member.iter().map(|e| e.len() as u64).collect(),
        })
    }

    fn split(
        &self,
        merged: &TaggedStream,
        member_sizes: &[u64],
    ) -> Result<Vec<TaggedStream>, tambakError> {
        let elements = check_string_split(merged, member_sizes)?;
        let rounds = member_sizes.iter().copied().max().unwrap_or(0);

        let mut parts: Vec<Vec<&[u8]>> = member_sizes
            .iter()
            .map(|&n| Vec::with_capacity(n as usize))
            .collect();
        let mut next = elements.into_iter();
        for round in 0..rounds {
            for (part, &count) in parts.iter_mut().zip(member_sizes.iter()) {
                if round < count {
                    // Counts were checked against the merged total above.
                    if let Some(element) = next.next() {
                        part.push(element);
                    }
                }
            }
        }
        parts.iter().map(|p| strings_from(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn strs(items: &[&str]) -> TaggedStream {
        let content = items.concat().into_bytes();
        let lens = items.iter().map(|s| s.len() as u32).collect();
        TaggedStream::strings(content, lens).unwrap()
    }

    #[test]
    fn test_numeric_concat_appends_and_splits() {
        let a = TaggedStream::numeric_from_slice(&[1u32, 2]).unwrap();
        let b = TaggedStream::numeric_from_slice(&[3u32]).unwrap();
        let out = NumericConcat.concat(&[&a, &b]).unwrap();
        assert_eq!(out.member_sizes, vec![2, 1]);
        assert_eq!(out.merged, TaggedStream::numeric_from_slice(&[1u32, 2, 3]).unwrap());
        let parts = NumericConcat.split(&out.merged, &out.member_sizes).unwrap();
        assert_eq!(parts, vec![a, b]);
    }

    #[test]
    fn test_mixed_widths_are_invalid_input() {
        let a = TaggedStream::numeric_from_slice(&[1u32]).unwrap();
        let b = TaggedStream::numeric_from_slice(&[1u64]).unwrap();
        let err = NumericConcat.concat(&[&a, &b]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let s = TaggedStream::structs(3, vec![0; 6]).unwrap();
        let t = TaggedStream::structs(2, vec![0; 6]).unwrap();
        assert!(StructConcat.concat(&[&s, &t]).is_err());
    }

    #[test]
    fn test_wrong_type_is_invalid_input() {
        let a = TaggedStream::serial(b"ab".to_vec());
        let b = TaggedStream::numeric_from_slice(&[1u8]).unwrap();
        let err = SerialConcat.concat(&[&a, &b]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_split_rejects_sizes_that_disagree() {
        let merged = TaggedStream::serial(b"abcdef".to_vec());
        assert!(SerialConcat.split(&merged, &[2, 4]).is_ok());
        assert_eq!(
            SerialConcat.split(&merged, &[2, 3]).unwrap_err().kind(),
            ErrorKind::Corruption
        );
        assert_eq!(
            SerialConcat.split(&merged, &[2, 5]).unwrap_err().kind(),
            ErrorKind::Corruption
        );
        assert_eq!(
            StringConcat.split(&strs(&["a"]), &[2]).unwrap_err().kind(),
            ErrorKind::Corruption
        );
    }

    #[test]
    fn test_string_concat_keeps_element_boundaries() {
        let a = strs(&["ab", "c"]);
        let b = strs(&["", "def"]);
        let out = StringConcat.concat(&[&a, &b]).unwrap();
        assert_eq!(out.merged, strs(&["ab", "c", "", "def"]));
        assert_eq!(StringConcat.split(&out.merged, &out.member_sizes).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_interleave_is_round_robin() {
        let a = strs(&["a0", "a1", "a2"]);
        let b = strs(&["b0"]);
        let c = strs(&["c0", "c1"]);
        let out = StringInterleaveConcat.concat(&[&a, &b, &c]).unwrap();
        assert_eq!(out.merged, strs(&["a0", "b0", "c0", "a1", "c1", "a2"]));
        assert_eq!(out.member_sizes, vec![3, 1, 2]);
        let parts = StringInterleaveConcat
            .split(&out.merged, &out.member_sizes)
            .unwrap();
        assert_eq!(parts, vec![a, b, c]);
    }
}
