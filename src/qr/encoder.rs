//! Outbound fragmentation

use super::types::{QrFrame, FRAME_HEADER_LEN};
use super::{CodecError, CodecResult};
use crate::utils::settings::MIN_FRAME_SIZE;

/// Split `data` into frames of at most `max_frame_size` wire bytes, frame 0
/// first. Empty data yields one empty frame.
pub fn fragment(data: &[u8], max_frame_size: usize) -> CodecResult<Vec<QrFrame>> {
    if max_frame_size < MIN_FRAME_SIZE {
        return Err(CodecError::InvalidFrameSize(max_frame_size));
    }
    let chunk_size = max_frame_size - FRAME_HEADER_LEN;

    if data.is_empty() {
        return Ok(vec![QrFrame::new(1, 0, Vec::new())]);
    }

    let chunk_count = data.len().div_ceil(chunk_size);
    let total = u16::try_from(chunk_count).map_err(|_| CodecError::PayloadTooLarge(data.len()))?;

    Ok(data
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, chunk)| QrFrame::new(total, index as u16, chunk.to_vec()))
        .collect())
}

/// [`fragment`] straight to wire bytes
pub fn fragment_bytes(data: &[u8], max_frame_size: usize) -> CodecResult<Vec<Vec<u8>>> {
    Ok(fragment(data, max_frame_size)?
        .iter()
        .map(QrFrame::to_bytes)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_sizes() {
        let data: Vec<u8> = (0..=255).collect();
        let frames = fragment(&data, 105).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload.len(), 100);
        assert_eq!(frames[2].payload.len(), 56);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.frame_index as usize, i);
            assert_eq!(frame.total_frames, 3);
            assert!(frame.to_bytes().len() <= 105);
        }
    }

    #[test]
    fn test_fragment_is_deterministic() {
        let data = vec![9u8; 1000];
        assert_eq!(fragment(&data, 64).unwrap(), fragment(&data, 64).unwrap());
    }

    #[test]
    fn test_small_payload_single_frame() {
        let frames = fragment(b"abc", 1024).unwrap();
        assert_eq!(frames, vec![QrFrame::new(1, 0, b"abc".to_vec())]);
    }

    #[test]
    fn test_empty_payload() {
        let frames = fragment(&[], 64).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload.is_empty());
    }

    #[test]
    fn test_frame_size_too_small() {
        assert_eq!(
            fragment(b"abc", 5),
            Err(CodecError::InvalidFrameSize(5))
        );
    }

    #[test]
    fn test_too_many_frames() {
        let data = vec![0u8; 70_000];
        assert_eq!(
            fragment(&data, MIN_FRAME_SIZE),
            Err(CodecError::PayloadTooLarge(70_000))
        );
    }
}
