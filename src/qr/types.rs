//! QR frame types
//!
//! Multi-frame wire form: `0x00 | total_frames u16 BE | frame_index u16 BE | chunk`.
//! Anything not starting with `0x00` is a complete single-frame payload.

use serde::{Deserialize, Serialize};

use super::CodecError;
use crate::serde_bytes::hex_vec;

pub const MULTI_FRAME_MARKER: u8 = 0x00;
pub const FRAME_HEADER_LEN: usize = 5;

/// A single QR code frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrFrame {
    pub total_frames: u16,
    /// 0-based
    pub frame_index: u16,
    #[serde(with = "hex_vec")]
    pub payload: Vec<u8>,
}

impl QrFrame {
    pub fn new(total_frames: u16, frame_index: u16, payload: Vec<u8>) -> Self {
        Self {
            total_frames,
            frame_index,
            payload,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        out.push(MULTI_FRAME_MARKER);
        out.extend_from_slice(&self.total_frames.to_be_bytes());
        out.extend_from_slice(&self.frame_index.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse scanned bytes. Raw payloads become frame 0 of 1.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        match bytes.first() {
            None => Err(CodecError::InvalidFrame("empty frame".to_string())),
            Some(&MULTI_FRAME_MARKER) => {
                if bytes.len() < FRAME_HEADER_LEN {
                    return Err(CodecError::InvalidFrame(format!(
                        "header needs {} bytes, got {}",
                        FRAME_HEADER_LEN,
                        bytes.len()
                    )));
                }
                let total_frames = u16::from_be_bytes([bytes[1], bytes[2]]);
                let frame_index = u16::from_be_bytes([bytes[3], bytes[4]]);
                let frame = Self::new(total_frames, frame_index, bytes[FRAME_HEADER_LEN..].to_vec());
                frame.check()?;
                Ok(frame)
            }
            Some(_) => Ok(Self::new(1, 0, bytes.to_vec())),
        }
    }

    /// Header sanity: at least one frame and an index inside the sequence
    pub fn check(&self) -> Result<(), CodecError> {
        if self.total_frames == 0 {
            return Err(CodecError::InvalidFrame("zero total frames".to_string()));
        }
        if self.frame_index >= self.total_frames {
            return Err(CodecError::InvalidFrame(format!(
                "frame index {} outside {} frames",
                self.frame_index, self.total_frames
            )));
        }
        Ok(())
    }
}

/// Scan result from the frame decoder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ScanResult {
    Complete {
        #[serde(with = "hex_vec")]
        payload: Vec<u8>,
    },
    Partial {
        received: usize,
        total: usize,
        progress: f32,
    },
}

impl ScanResult {
    pub fn partial(received: usize, total: usize) -> Self {
        ScanResult::Partial {
            received,
            total,
            progress: received as f32 / total.max(1) as f32,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ScanResult::Complete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_wire_form() {
        let frame = QrFrame::new(3, 1, vec![0xAA, 0xBB]);
        let bytes = frame.to_bytes();
        assert_eq!(bytes, vec![0x00, 0x00, 0x03, 0x00, 0x01, 0xAA, 0xBB]);
        assert_eq!(QrFrame::from_bytes(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_raw_payload_is_single_frame() {
        let frame = QrFrame::from_bytes(&[0x53, 0x01, 0x02]).unwrap();
        assert_eq!(frame.total_frames, 1);
        assert_eq!(frame.frame_index, 0);
        assert_eq!(frame.payload, vec![0x53, 0x01, 0x02]);
    }

    #[test]
    fn test_invalid_headers() {
        assert!(matches!(QrFrame::from_bytes(&[]), Err(CodecError::InvalidFrame(_))));
        assert!(matches!(
            QrFrame::from_bytes(&[0x00, 0x00, 0x01]),
            Err(CodecError::InvalidFrame(_))
        ));
        // index 2 of 2
        assert!(matches!(
            QrFrame::from_bytes(&[0x00, 0x00, 0x02, 0x00, 0x02, 0x01]),
            Err(CodecError::InvalidFrame(_))
        ));
        assert!(matches!(
            QrFrame::from_bytes(&[0x00, 0x00, 0x00, 0x00, 0x00]),
            Err(CodecError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_scan_result_json() {
        let json = serde_json::to_string(&ScanResult::partial(1, 4)).unwrap();
        assert!(json.contains("\"status\":\"partial\""));
        assert!(json.contains("\"progress\":0.25"));
    }
}
