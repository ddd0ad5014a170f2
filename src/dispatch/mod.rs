//! This module implements segment dispatch: splitting one input into one
//! output stream per tag.
//!
//! A lexer describes its input as a [`SegmentPartition`]. The dispatcher checks
//! the whole partition against the source first and only then copies bytes, so
//! a rejected request never produces partial output. Segments that share a tag
//! land in the same channel in their original relative order.
//!
//! [`restore_bytes`] and [`restore_elements`] are the inverses, used when a
//! frame is decompressed.

mod partition;
mod restore;

pub use partition::{Segment, SegmentPartition};
pub use restore::{restore_bytes, restore_elements};

use crate::error::tambakError;
use crate::types::{StreamType, TaggedStream, DISPATCH_CHANNEL_ID};

/// Byte dispatch supports up to this many channels.
pub const MAX_DISPATCH_TAGS: u32 = 1 << 16;
/// Element dispatch supports up to this many channels.
pub const MAX_ELEMENT_DISPATCH_TAGS: u32 = 256;

/// Splits inputs into `nb_tags` channels.
///
/// `nb_tags` is fixed when the dispatcher is built, since it must agree with
/// the number of successors the surrounding graph declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDispatcher {
    nb_tags: u32,
}

impl StreamDispatcher {
    pub fn new(nb_tags: u32) -> Result<Self, tambakError> {
        if nb_tags == 0 || nb_tags >= MAX_DISPATCH_TAGS {
            return Err(tambakError::InvalidInput(format!(
                "Dispatch requires between 1 and {} tags, got {}",
                MAX_DISPATCH_TAGS - 1,
                nb_tags
            )));
        }
        Ok(Self { nb_tags })
    }

    pub fn nb_tags(&self) -> u32 {
        self.nb_tags
    }

    /// Cuts `source` along `partition`, producing exactly `nb_tags` serial
    /// channels. Channel `t` holds every segment tagged `t`, in order. Channels
    /// that receive no segment are present and empty.
    pub fn dispatch(
        &self,
        source: &[u8],
        partition: &SegmentPartition,
    ) -> Result<Vec<TaggedStream>, tambakError> {
        let channel_sizes = self.check_partition(source.len(), partition)?;

        let mut channels: Vec<Vec<u8>> = channel_sizes
            .iter()
            .map(|&size| Vec::with_capacity(size))
            .collect();
        for (offset, len, tag) in partition.segments() {
            channels[tag as usize].extend_from_slice(&source[offset..offset + len]);
        }

        log_metric!(
            "event" = "dispatch_bytes",
            "nb_tags" = &self.nb_tags,
            "nb_segments" = &partition.len(),
            "source_size" = &source.len()
        );

        Ok(channels
            .into_iter()
            .enumerate()
            .map(|(channel, bytes)| {
                let mut stream = TaggedStream::serial(bytes);
                stream.set_int_metadata(DISPATCH_CHANNEL_ID, channel as i32);
                stream
            })
            .collect())
    }

    /// Element variant: `source` is a string stream and `tags` holds one tag
    /// per element. Each channel is a string stream with element lengths kept.
    pub fn dispatch_elements(
        &self,
        source: &TaggedStream,
        tags: &[u32],
    ) -> Result<Vec<TaggedStream>, tambakError> {
        if self.nb_tags > MAX_ELEMENT_DISPATCH_TAGS {
            return Err(tambakError::InvalidInput(format!(
                "Element dispatch supports at most {} outputs, dispatcher has {}",
                MAX_ELEMENT_DISPATCH_TAGS, self.nb_tags
            )));
        }
        let lens = match (source.stream_type(), source.string_lens()) {
            (StreamType::String, Some(lens)) => lens,
            _ => {
                return Err(tambakError::InvalidInput(format!(
                    "Element dispatch requires a String stream, got {}",
                    source.type_width()
                )))
            }
        };
        if lens.len() != tags.len() {
            return Err(tambakError::InvalidInput(format!(
                "Element arity mismatch: {} elements but {} tags",
                lens.len(),
                tags.len()
            )));
        }
        self.check_tags(tags)?;

        let mut contents: Vec<Vec<u8>> = vec![Vec::new(); self.nb_tags as usize];
        let mut channel_lens: Vec<Vec<u32>> = vec![Vec::new(); self.nb_tags as usize];
        for ((element, &len), &tag) in source.elements().zip(lens.iter()).zip(tags.iter()) {
            contents[tag as usize].extend_from_slice(element);
            channel_lens[tag as usize].push(len);
        }

        log_metric!(
            "event" = "dispatch_elements",
            "nb_tags" = &self.nb_tags,
            "nb_elements" = &tags.len()
        );

        contents
            .into_iter()
            .zip(channel_lens)
            .enumerate()
            .map(|(channel, (content, lens))| {
                let mut stream = TaggedStream::strings(content, lens)?;
                stream.set_int_metadata(DISPATCH_CHANNEL_ID, channel as i32);
                Ok(stream)
            })
            .collect()
    }

    /// Validates a partition against a source of `source_len` bytes and returns
    /// the number of bytes each channel will receive.
    fn check_partition(
        &self,
        source_len: usize,
        partition: &SegmentPartition,
    ) -> Result<Vec<usize>, tambakError> {
        let mut channel_sizes = vec![0usize; self.nb_tags as usize];
        let mut total: usize = 0;
        for (i, (&len, &tag)) in partition
            .lengths()
            .iter()
            .zip(partition.tags().iter())
            .enumerate()
        {
            let len = len as usize;
            if len > source_len {
                return Err(tambakError::Corruption(format!(
                    "Segment {} has length {}, larger than the whole source ({} bytes)",
                    i, len, source_len
                )));
            }
            total = total
                .checked_add(len)
                .filter(|&t| t <= source_len)
                .ok_or_else(|| {
                    tambakError::Corruption(format!(
                        "Segment lengths exceed the source size ({} bytes) at segment {}",
                        source_len, i
                    ))
                })?;
            if tag >= self.nb_tags {
                return Err(tambakError::InvalidInput(format!(
                    "Segment {} has tag {}, outside [0, {})",
                    i, tag, self.nb_tags
                )));
            }
            channel_sizes[tag as usize] += len;
        }

        if total != source_len {
            return Err(tambakError::Corruption(format!(
                "Segment lengths sum to {} but the source holds {} bytes",
                total, source_len
            )));
        }
        Ok(channel_sizes)
    }

    fn check_tags(&self, tags: &[u32]) -> Result<(), tambakError> {
        match tags.iter().position(|&t| t >= self.nb_tags) {
            Some(i) => Err(tambakError::InvalidInput(format!(
                "Element {} has tag {}, outside [0, {})",
                i, tags[i], self.nb_tags
            ))),
            None => Ok(()),
        }
    }
}

/// One-shot form of [`StreamDispatcher::dispatch`] over raw arrays.
pub fn dispatch(
    source: &[u8],
    lengths: &[u32],
    tags: &[u32],
    nb_tags: u32,
) -> Result<Vec<TaggedStream>, tambakError> {
    let partition = SegmentPartition::new(lengths.to_vec(), tags.to_vec())?;
    StreamDispatcher::new(nb_tags)?.dispatch(source, &partition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_dispatch_groups_segments_by_tag() {
        let streams = dispatch(b"aabbbccccd", &[2, 3, 4, 1], &[0, 1, 0, 1], 2).unwrap();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].content(), b"aacccc");
        assert_eq!(streams[1].content(), b"bbbd");
        assert_eq!(streams[0].int_metadata(DISPATCH_CHANNEL_ID), Some(0));
        assert_eq!(streams[1].int_metadata(DISPATCH_CHANNEL_ID), Some(1));
        assert_eq!(streams[0].stream_type(), StreamType::Serial);
    }

    #[test]
    fn test_unused_channels_are_empty() {
        let streams = dispatch(b"xyz", &[3], &[2], 4).unwrap();
        assert_eq!(streams.len(), 4);
        assert!(streams[0].is_empty());
        assert!(streams[1].is_empty());
        assert_eq!(streams[2].content(), b"xyz");
        assert!(streams[3].is_empty());
    }

    #[test]
    fn test_error_classes() {
        // Arity.
        let err = dispatch(b"abc", &[1, 2], &[0], 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        // Sum short of the source.
        let err = dispatch(b"abcd", &[1, 2], &[0, 1], 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);

        // Sum beyond the source.
        let err = dispatch(b"abc", &[2, 2], &[0, 1], 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);

        // One segment larger than everything.
        let err = dispatch(b"abc", &[9], &[0], 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);

        // Tag out of range, reported with its value.
        let err = dispatch(b"abc", &[1, 2], &[0, 2], 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("tag 2"));
    }

    #[test]
    fn test_tag_count_limits() {
        assert!(StreamDispatcher::new(0).is_err());
        assert!(StreamDispatcher::new(MAX_DISPATCH_TAGS).is_err());
        assert!(StreamDispatcher::new(MAX_DISPATCH_TAGS - 1).is_ok());

        let wide = StreamDispatcher::new(300).unwrap();
        let source = TaggedStream::strings(b"ab".to_vec(), vec![1, 1]).unwrap();
        assert!(wide.dispatch_elements(&source, &[0, 1]).is_err());
    }

    #[test]
    fn test_element_dispatch_preserves_lengths() {
        let source =
            TaggedStream::strings(b"onetwothreefour".to_vec(), vec![3, 3, 5, 4]).unwrap();
        let channels = StreamDispatcher::new(3)
            .unwrap()
            .dispatch_elements(&source, &[1, 0, 1, 1])
            .unwrap();
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].content(), b"two");
        assert_eq!(channels[0].string_lens(), Some(&[3u32][..]));
        assert_eq!(channels[1].content(), b"onethreefour");
        assert_eq!(channels[1].string_lens(), Some(&[3u32, 5, 4][..]));
        assert!(channels[2].is_empty());
        assert_eq!(channels[2].stream_type(), StreamType::String);
    }

    #[test]
    fn test_element_dispatch_rejects_bad_requests() {
        let d = StreamDispatcher::new(2).unwrap();
        let numeric = TaggedStream::numeric_from_slice(&[1u32, 2]).unwrap();
        assert!(d.dispatch_elements(&numeric, &[0, 1]).is_err());

        let source = TaggedStream::strings(b"ab".to_vec(), vec![1, 1]).unwrap();
        assert_eq!(
            d.dispatch_elements(&source, &[0]).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            d.dispatch_elements(&source, &[0, 5]).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    fn random_partition(rng: &mut StdRng, source_len: usize, nb_tags: u32) -> SegmentPartition {
        let mut partition = SegmentPartition::default();
        let mut remaining = source_len;
        while remaining > 0 {
            let len = rng.random_range(0..=remaining.min(64));
            partition.push(len as u32, rng.random_range(0..nb_tags));
            remaining -= len;
        }
        partition
    }

    #[test]
    fn test_conservation_and_tag_isolation_randomized() {
        let mut rng = StdRng::seed_from_u64(0x7A6B);
        for _ in 0..200 {
            let source_len = rng.random_range(0..2048);
            let source: Vec<u8> = (0..source_len).map(|_| rng.random()).collect();
            let nb_tags = rng.random_range(1..8);
            let partition = random_partition(&mut rng, source_len, nb_tags);

            let dispatcher = StreamDispatcher::new(nb_tags).unwrap();
            let channels = dispatcher.dispatch(&source, &partition).unwrap();

            // Tag isolation: channel t is exactly the tag-t segments, in order.
            for t in 0..nb_tags {
                let expected: Vec<u8> = partition
                    .segments()
                    .filter(|&(_, _, tag)| tag == t)
                    .flat_map(|(o, l, _)| source[o..o + l].iter().copied())
                    .collect();
                assert_eq!(channels[t as usize].content(), &expected[..]);
            }

            // Conservation: walking the partition over the channels rebuilds the source.
            assert_eq!(restore_bytes(&channels, &partition).unwrap(), source);
        }
    }
}
