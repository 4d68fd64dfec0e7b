use std::io::{Read, Write};

use rti_serde::ByteWriter;

use crate::transport::TransportError;

/// Bytes taken by the kind tag and length prefix
pub const FRAME_HEADER_LENGTH: usize = 8;

/// What a frame carries. Each kind has a fixed 4-byte tag on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Welcome,
    Ready,
    DataMessage,
    ControlSync,
    ControlAsync,
    ControlResponse,
    Bundle,
}

impl FrameKind {
    pub fn tag(&self) -> u32 {
        match self {
            FrameKind::Welcome => 0x0000_0001,
            FrameKind::Ready => 0x0000_0002,
            FrameKind::DataMessage => 0x0000_0010,
            FrameKind::ControlSync => 0x0000_0020,
            FrameKind::ControlAsync => 0x0000_0021,
            FrameKind::ControlResponse => 0x0000_0022,
            FrameKind::Bundle => 0x0000_cafe,
        }
    }

    pub fn from_tag(tag: u32) -> Result<Self, TransportError> {
        match tag {
            0x0000_0001 => Ok(FrameKind::Welcome),
            0x0000_0002 => Ok(FrameKind::Ready),
            0x0000_0010 => Ok(FrameKind::DataMessage),
            0x0000_0020 => Ok(FrameKind::ControlSync),
            0x0000_0021 => Ok(FrameKind::ControlAsync),
            0x0000_0022 => Ok(FrameKind::ControlResponse),
            0x0000_cafe => Ok(FrameKind::Bundle),
            tag => Err(TransportError::UnknownFrameKind { tag }),
        }
    }

    /// Someone is blocked waiting on these, so they skip the bundling timer
    pub fn is_urgent(&self) -> bool {
        matches!(
            self,
            FrameKind::ControlSync
                | FrameKind::ControlResponse
                | FrameKind::Welcome
                | FrameKind::Ready
        )
    }

    /// Control frames that start with a 4-byte request id
    pub fn has_request_id(&self) -> bool {
        matches!(self, FrameKind::ControlSync | FrameKind::ControlResponse)
    }
}

/// One framed unit: a kind tag, then a big-endian length, then the payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    /// Builds a control frame whose payload is prefixed with `request_id`
    pub fn with_request_id(kind: FrameKind, request_id: u32, body: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(4 + body.len());
        payload.extend_from_slice(&request_id.to_be_bytes());
        payload.extend_from_slice(body);
        Self { kind, payload }
    }

    /// Splits a control frame into its request id and the message bytes
    pub fn split_request_id(&self) -> Result<(u32, &[u8]), TransportError> {
        if self.payload.len() < 4 {
            return Err(TransportError::MissingRequestId {
                length: self.payload.len(),
            });
        }
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.payload[..4]);
        Ok((u32::from_be_bytes(raw), &self.payload[4..]))
    }

    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_LENGTH + self.payload.len()
    }

    pub fn write_into(&self, writer: &mut ByteWriter) {
        write_frame(writer, self.kind, &self.payload);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(self.encoded_len());
        self.write_into(&mut writer);
        writer.to_bytes()
    }
}

pub fn write_frame(writer: &mut ByteWriter, kind: FrameKind, payload: &[u8]) {
    writer.write_u32(kind.tag());
    writer.write_u32(payload.len() as u32);
    writer.write_bytes(payload);
}

/// Writes a header only; the caller follows it with `length` payload bytes
pub fn write_header<W: Write>(stream: &mut W, kind: FrameKind, length: usize) -> Result<(), TransportError> {
    let mut header = [0u8; FRAME_HEADER_LENGTH];
    header[..4].copy_from_slice(&kind.tag().to_be_bytes());
    header[4..].copy_from_slice(&(length as u32).to_be_bytes());
    stream.write_all(&header)?;
    Ok(())
}

/// Blocks until one whole frame has been read from the stream
pub fn read_frame<R: Read>(stream: &mut R, max_frame_size: usize) -> Result<Frame, TransportError> {
    let mut header = [0u8; FRAME_HEADER_LENGTH];
    stream.read_exact(&mut header)?;

    let mut raw = [0u8; 4];
    raw.copy_from_slice(&header[..4]);
    let kind = FrameKind::from_tag(u32::from_be_bytes(raw))?;
    raw.copy_from_slice(&header[4..]);
    let length = u32::from_be_bytes(raw) as usize;
    if length > max_frame_size {
        return Err(TransportError::FrameTooLarge {
            length,
            limit: max_frame_size,
        });
    }

    let mut payload = vec![0u8; length];
    stream.read_exact(&mut payload)?;
    Ok(Frame { kind, payload })
}

/// Packs complete frames back to back into the payload of one bundle frame
pub fn pack_bundle(frames: &[Frame]) -> Frame {
    let total = frames.iter().map(Frame::encoded_len).sum();
    let mut writer = ByteWriter::with_capacity(total);
    for frame in frames {
        frame.write_into(&mut writer);
    }
    Frame::new(FrameKind::Bundle, writer.to_bytes())
}

/// Splits a bundle payload back into its sub-frames, in the order they
/// were packed
pub fn unpack_bundle(payload: &[u8]) -> Result<Vec<Frame>, TransportError> {
    let mut frames = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        if payload.len() - offset < FRAME_HEADER_LENGTH {
            return Err(TransportError::MalformedBundle { offset });
        }
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&payload[offset..offset + 4]);
        let kind = FrameKind::from_tag(u32::from_be_bytes(raw))?;
        raw.copy_from_slice(&payload[offset + 4..offset + 8]);
        let length = u32::from_be_bytes(raw) as usize;

        let start = offset + FRAME_HEADER_LENGTH;
        if payload.len() - start < length {
            return Err(TransportError::MalformedBundle { offset });
        }
        frames.push(Frame::new(kind, payload[start..start + length].to_vec()));
        offset = start + length;
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn header_is_tag_then_big_endian_length() {
        let frame = Frame::new(FrameKind::DataMessage, vec![7, 8, 9]);
        let bytes = frame.to_bytes();
        assert_eq!(&bytes[..8], &[0, 0, 0, 0x10, 0, 0, 0, 3]);
        assert_eq!(&bytes[8..], &[7, 8, 9]);
    }

    #[test]
    fn read_frame_rejects_oversized_lengths() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&FrameKind::DataMessage.tag().to_be_bytes());
        bytes.extend_from_slice(&1000u32.to_be_bytes());
        let result = read_frame(&mut Cursor::new(bytes), 100);
        assert!(matches!(
            result,
            Err(TransportError::FrameTooLarge { length: 1000, limit: 100 })
        ));
    }

    #[test]
    fn request_id_prefix_round_trips() {
        let frame = Frame::with_request_id(FrameKind::ControlSync, 42, b"body");
        let (id, body) = frame.split_request_id().unwrap();
        assert_eq!(id, 42);
        assert_eq!(body, b"body");

        let short = Frame::new(FrameKind::ControlResponse, vec![1, 2]);
        assert!(short.split_request_id().is_err());
    }

    #[test]
    fn truncated_bundle_is_rejected() {
        let bundle = pack_bundle(&[
            Frame::new(FrameKind::DataMessage, vec![1; 10]),
            Frame::new(FrameKind::ControlAsync, vec![2; 10]),
        ]);
        let cut = &bundle.payload[..bundle.payload.len() - 3];
        assert!(matches!(
            unpack_bundle(cut),
            Err(TransportError::MalformedBundle { offset: 18 })
        ));
    }

    #[test]
    fn empty_bundle_unpacks_to_nothing() {
        assert_eq!(unpack_bundle(&[]).unwrap(), Vec::new());
    }
}
