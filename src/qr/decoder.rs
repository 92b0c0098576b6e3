//! Inbound reassembly
//!
//! [`reassemble`] works on a complete frame set; [`FrameDecoder`] accepts
//! frames one at a time as the camera reports them.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::types::{QrFrame, ScanResult};
use super::{CodecError, CodecResult};
use crate::{log_debug, log_warn};

/// Join a full frame set, in any order
pub fn reassemble(frames: &[QrFrame]) -> CodecResult<Vec<u8>> {
    let first = frames.first().ok_or(CodecError::IncompleteSequence {
        received: 0,
        total: 0,
    })?;
    let total = first.total_frames;

    let mut parts: BTreeMap<u16, &[u8]> = BTreeMap::new();
    for frame in frames {
        if frame.total_frames != total {
            return Err(CodecError::FrameMismatch {
                expected: total,
                found: frame.total_frames,
            });
        }
        frame.check()?;
        if let Some(existing) = parts.insert(frame.frame_index, &frame.payload) {
            if existing != frame.payload.as_slice() {
                return Err(CodecError::ConflictingFrame {
                    index: frame.frame_index,
                });
            }
        }
    }

    if parts.len() < total as usize {
        return Err(CodecError::IncompleteSequence {
            received: parts.len(),
            total: total as usize,
        });
    }
    Ok(parts.values().flat_map(|part| part.iter().copied()).collect())
}

/// Stateful multi-frame decoder
#[derive(Debug)]
pub struct FrameDecoder {
    total: Option<u16>,
    frames: BTreeMap<u16, Vec<u8>>,
    started: Option<Instant>,
    timeout: Duration,
}

impl FrameDecoder {
    pub fn new(timeout: Duration) -> Self {
        Self {
            total: None,
            frames: BTreeMap::new(),
            started: None,
            timeout,
        }
    }

    pub fn reset(&mut self) {
        self.total = None;
        self.frames.clear();
        self.started = None;
    }

    pub fn is_idle(&self) -> bool {
        self.total.is_none()
    }

    /// `(received, total)` of the sequence in progress
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.total.map(|t| (self.frames.len(), t as usize))
    }

    /// Parse and accept one scanned frame. Any error discards the partial scan.
    pub fn receive_bytes(&mut self, bytes: &[u8]) -> CodecResult<ScanResult> {
        let frame = match QrFrame::from_bytes(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                self.discard("invalid frame");
                return Err(e);
            }
        };
        self.receive(frame)
    }

    pub fn receive(&mut self, frame: QrFrame) -> CodecResult<ScanResult> {
        self.receive_at(frame, Instant::now())
    }

    fn discard(&mut self, reason: &str) {
        if let Some((received, total)) = self.progress() {
            log_warn!(
                "qr",
                "Partial scan discarded",
                reason = reason,
                received = received,
                total = total
            );
        }
        self.reset();
    }

    fn receive_at(&mut self, frame: QrFrame, now: Instant) -> CodecResult<ScanResult> {
        if let Err(e) = frame.check() {
            self.discard("invalid frame");
            return Err(e);
        }

        if let Some(started) = self.started {
            if now.duration_since(started) > self.timeout {
                log_warn!(
                    "qr",
                    "Reassembly expired",
                    received = self.frames.len(),
                    total = self.total.unwrap_or(0)
                );
                self.reset();
                return Err(CodecError::Expired);
            }
        }

        let total = match self.total {
            None => {
                self.total = Some(frame.total_frames);
                self.started = Some(now);
                frame.total_frames
            }
            Some(total) if total != frame.total_frames => {
                self.reset();
                return Err(CodecError::FrameMismatch {
                    expected: total,
                    found: frame.total_frames,
                });
            }
            Some(total) => total,
        };

        if let Some(existing) = self.frames.get(&frame.frame_index) {
            if existing != &frame.payload {
                let index = frame.frame_index;
                self.reset();
                return Err(CodecError::ConflictingFrame { index });
            }
        } else {
            self.frames.insert(frame.frame_index, frame.payload);
        }

        let received = self.frames.len();
        if received < total as usize {
            log_debug!("qr", "Frame accepted", received = received, total = total);
            return Ok(ScanResult::partial(received, total as usize));
        }

        let payload: Vec<u8> = self.frames.values().flatten().copied().collect();
        self.reset();
        log_debug!("qr", "Payload reassembled", bytes = payload.len());
        Ok(ScanResult::Complete { payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::encoder::fragment;

    fn data() -> Vec<u8> {
        (0..200u16).map(|i| (i * 7) as u8).collect()
    }

    #[test]
    fn test_reassemble_any_order() {
        let mut frames = fragment(&data(), 40).unwrap();
        frames.reverse();
        frames.swap(0, 2);
        assert_eq!(reassemble(&frames).unwrap(), data());
    }

    #[test]
    fn test_reassemble_incomplete() {
        let frames = fragment(&data(), 40).unwrap();
        assert_eq!(
            reassemble(&frames[1..]),
            Err(CodecError::IncompleteSequence {
                received: frames.len() - 1,
                total: frames.len()
            })
        );
        assert!(matches!(
            reassemble(&[]),
            Err(CodecError::IncompleteSequence { .. })
        ));
    }

    #[test]
    fn test_reassemble_total_mismatch() {
        let mut frames = fragment(&data(), 40).unwrap();
        frames[1].total_frames += 1;
        assert!(matches!(
            reassemble(&frames),
            Err(CodecError::FrameMismatch { .. })
        ));
    }

    #[test]
    fn test_decoder_progress_and_duplicates() {
        let frames = fragment(&data(), 40).unwrap();
        let total = frames.len();
        let mut decoder = FrameDecoder::new(Duration::from_secs(60));

        let first = decoder.receive(frames[2].clone()).unwrap();
        assert_eq!(first, ScanResult::partial(1, total));
        // Same frame again: tolerated, no progress
        assert_eq!(decoder.receive(frames[2].clone()).unwrap(), ScanResult::partial(1, total));
        assert_eq!(decoder.progress(), Some((1, total)));

        let mut last = None;
        for frame in frames.iter().filter(|f| f.frame_index != 2) {
            last = Some(decoder.receive(frame.clone()).unwrap());
        }
        assert_eq!(last, Some(ScanResult::Complete { payload: data() }));
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_decoder_total_mismatch_clears() {
        let mut decoder = FrameDecoder::new(Duration::from_secs(60));
        decoder.receive(QrFrame::new(3, 0, vec![1])).unwrap();
        assert_eq!(
            decoder.receive(QrFrame::new(4, 1, vec![2])),
            Err(CodecError::FrameMismatch {
                expected: 3,
                found: 4
            })
        );
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_decoder_conflicting_duplicate() {
        let mut decoder = FrameDecoder::new(Duration::from_secs(60));
        decoder.receive(QrFrame::new(2, 0, vec![1])).unwrap();
        assert_eq!(
            decoder.receive(QrFrame::new(2, 0, vec![9])),
            Err(CodecError::ConflictingFrame { index: 0 })
        );
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_decoder_timeout() {
        let mut decoder = FrameDecoder::new(Duration::from_secs(10));
        let start = Instant::now();
        decoder.receive_at(QrFrame::new(2, 0, vec![1]), start).unwrap();
        assert_eq!(
            decoder.receive_at(QrFrame::new(2, 1, vec![2]), start + Duration::from_secs(11)),
            Err(CodecError::Expired)
        );
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_single_raw_frame() {
        let mut decoder = FrameDecoder::new(Duration::from_secs(60));
        assert_eq!(
            decoder.receive_bytes(&[0x53, 0x01]).unwrap(),
            ScanResult::Complete {
                payload: vec![0x53, 0x01]
            }
        );
    }

    #[test]
    fn test_invalid_frame_clears_buffer() {
        let mut decoder = FrameDecoder::new(Duration::from_secs(60));
        decoder.receive(QrFrame::new(2, 0, vec![1])).unwrap();
        assert!(matches!(
            decoder.receive_bytes(&[0x00, 0x01]),
            Err(CodecError::InvalidFrame(_))
        ));
        assert!(decoder.is_idle());
        assert_eq!(decoder.progress(), None);

        // Index out of range fails the frame check
        decoder.receive(QrFrame::new(2, 0, vec![1])).unwrap();
        assert!(matches!(
            decoder.receive(QrFrame::new(2, 5, vec![2])),
            Err(CodecError::InvalidFrame(_))
        ));
        assert!(decoder.is_idle());

        // A fresh sequence starts cleanly afterwards
        assert_eq!(
            decoder.receive(QrFrame::new(1, 0, vec![9])).unwrap(),
            ScanResult::Complete { payload: vec![9] }
        );
    }
}
