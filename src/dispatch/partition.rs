//! The `SegmentPartition` descriptor: how to cut one input into tagged parts.

use crate::error::tambakError;

/// One contiguous part of an input. Its offset is implicit: the running sum of
/// the lengths before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub length: u32,
    pub tag: u32,
}

/// An ordered list of segment lengths plus a parallel list of tags.
///
/// A partition never owns data. It is built by a lexer, consumed once by the
/// dispatcher, and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentPartition {
    lengths: Vec<u32>,
    tags: Vec<u32>,
}

impl SegmentPartition {
    /// Pairs `lengths[i]` with `tags[i]`. The two arrays must have equal length.
    pub fn new(lengths: Vec<u32>, tags: Vec<u32>) -> Result<Self, tambakError> {
        if lengths.len() != tags.len() {
            return Err(tambakError::InvalidInput(format!(
                "Segment arity mismatch: {} lengths but {} tags",
                lengths.len(),
                tags.len()
            )));
        }
        Ok(Self { lengths, tags })
    }

    pub fn from_segments(segments: &[Segment]) -> Self {
        Self {
            lengths: segments.iter().map(|s| s.length).collect(),
            tags: segments.iter().map(|s| s.tag).collect(),
        }
    }

    /// Appends one segment.
    pub fn push(&mut self, length: u32, tag: u32) {
        self.lengths.push(length);
        self.tags.push(tag);
    }

    pub fn lengths(&self) -> &[u32] {
        &self.lengths
    }

    pub fn tags(&self) -> &[u32] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Sum of all lengths, or `None` on overflow.
    pub fn total_len(&self) -> Option<u64> {
        self.lengths
            .iter()
            .try_fold(0u64, |acc, &l| acc.checked_add(u64::from(l)))
    }

    /// Iterates `(offset, length, tag)` triples in order.
    pub fn segments(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.lengths
            .iter()
            .zip(self.tags.iter())
            .scan(0usize, |offset, (&len, &tag)| {
                let start = *offset;
                *offset += len as usize;
                Some((start, len as usize, tag))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_mismatch_is_invalid_input() {
        let err = SegmentPartition::new(vec![1, 2], vec![0]).unwrap_err();
        assert!(matches!(err, tambakError::InvalidInput(_)));
    }

    #[test]
    fn test_segments_carry_implicit_offsets() {
        let p = SegmentPartition::new(vec![2, 3, 4, 1], vec![0, 1, 0, 1]).unwrap();
        let segs: Vec<_> = p.segments().collect();
        assert_eq!(segs, vec![(0, 2, 0), (2, 3, 1), (5, 4, 0), (9, 1, 1)]);
        assert_eq!(p.total_len(), Some(10));
    }

    #[test]
    fn test_from_segments_matches_new() {
        let a = SegmentPartition::from_segments(&[
            Segment { length: 5, tag: 2 },
            Segment { length: 0, tag: 1 },
        ]);
        let mut b = SegmentPartition::default();
        b.push(5, 2);
        b.push(0, 1);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }
}
