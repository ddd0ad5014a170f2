//! Inverses of dispatch: reassembling the original input from its channels.
//!
//! Channels here come from a decoded frame, so any disagreement between the
//! channels and the partition is treated as corruption.

use crate::error::tambakError;
use crate::types::TaggedStream;

use super::SegmentPartition;

/// Rebuilds the dispatched byte source by walking `partition` in order and
/// taking each segment from the front of its channel.
///
/// Every channel must be consumed exactly.
pub fn restore_bytes(
    channels: &[TaggedStream],
    partition: &SegmentPartition,
) -> Result<Vec<u8>, tambakError> {
    let total = partition
        .total_len()
        .ok_or_else(|| tambakError::Corruption("Segment lengths overflow".to_string()))?;
    let available: u64 = channels.iter().map(|c| c.content_size() as u64).sum();
    if total != available {
        return Err(tambakError::Corruption(format!(
            "Segments describe {} bytes but channels hold {}",
            total, available
        )));
    }

    let mut cursors = vec![0usize; channels.len()];
    let mut output = Vec::with_capacity(total as usize);
    for (i, (_, len, tag)) in partition.segments().enumerate() {
        let channel = channels.get(tag as usize).ok_or_else(|| {
            tambakError::Corruption(format!(
                "Segment {} refers to channel {}, only {} exist",
                i,
                tag,
                channels.len()
            ))
        })?;
        let start = cursors[tag as usize];
        let bytes = channel
            .content()
            .get(start..start + len)
            .ok_or_else(|| {
                tambakError::Corruption(format!(
                    "Channel {} ran out of bytes at segment {}",
                    tag, i
                ))
            })?;
        output.extend_from_slice(bytes);
        cursors[tag as usize] += len;
    }

    check_consumed(channels, &cursors, |c| c.content_size())?;
    Ok(output)
}

/// Rebuilds a dispatched string stream: element `i` is taken from the front of
/// channel `tags[i]`.
pub fn restore_elements(
    channels: &[TaggedStream],
    tags: &[u32],
) -> Result<TaggedStream, tambakError> {
    let mut per_channel: Vec<Vec<&[u8]>> = Vec::with_capacity(channels.len());
    for (channel_idx, channel) in channels.iter().enumerate() {
        if channel.string_lens().is_none() {
            return Err(tambakError::Corruption(format!(
                "Channel {} is {}, expected String",
                channel_idx,
                channel.type_width()
            )));
        }
        per_channel.push(channel.elements().collect());
    }

    let mut cursors = vec![0usize; channels.len()];
    let mut content = Vec::new();
    let mut lens = Vec::with_capacity(tags.len());
    for (i, &tag) in tags.iter().enumerate() {
        let element = per_channel
            .get(tag as usize)
            .and_then(|elts| elts.get(cursors[tag as usize]))
            .ok_or_else(|| {
                tambakError::Corruption(format!(
                    "No element left in channel {} for element {}",
                    tag, i
                ))
            })?;
        content.extend_from_slice(element);
        lens.push(element.len() as u32);
        cursors[tag as usize] += 1;
    }

    check_consumed(channels, &cursors, |c| c.num_elts())?;
    TaggedStream::strings(content, lens)
}

fn check_consumed(
    channels: &[TaggedStream],
    cursors: &[usize],
    size_of: impl Fn(&TaggedStream) -> usize,
) -> Result<(), tambakError> {
    for (idx, (channel, &used)) in channels.iter().zip(cursors.iter()).enumerate() {
        let size = size_of(channel);
        if used != size {
            return Err(tambakError::Corruption(format!(
                "Channel {} holds {} units but only {} were referenced",
                idx, size, used
            )));
        }
    }
    Ok(())
}
