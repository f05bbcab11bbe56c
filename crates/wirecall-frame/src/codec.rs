use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Protocol version written on every frame. Received versions are carried
/// through but not validated; trailing fields added by a future version must
/// not break older decoders.
pub const PROTOCOL_VERSION: u8 = 1;

/// Fixed header size: version (1) + requestId (4) + frameType (1)
/// + methodLen (4) + payloadLen (4) = 14 bytes.
///
/// The two length words are not adjacent on the wire — the method bytes sit
/// between them — but both count toward this constant.
pub const HEADER_SIZE: usize = 14;

/// Kind of a frame, one per wire exchange role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Unary request (client → server) or unary response (server → client).
    Unary,
    /// One element of a streaming response.
    StreamChunk,
    /// Normal termination of a streaming response.
    StreamEnd,
    /// Application-level failure; payload is a UTF-8 message.
    Error,
}

impl FrameType {
    /// Wire value of this frame type.
    pub fn as_wire(self) -> u8 {
        match self {
            FrameType::Unary => 0,
            FrameType::StreamChunk => 1,
            FrameType::StreamEnd => 2,
            FrameType::Error => 3,
        }
    }

    /// Parse a wire value, `None` if outside the protocol range.
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(FrameType::Unary),
            1 => Some(FrameType::StreamChunk),
            2 => Some(FrameType::StreamEnd),
            3 => Some(FrameType::Error),
            _ => None,
        }
    }
}

/// One protocol message.
///
/// `method` is meaningful on the first frame of a call; response frames echo
/// it for diagnostics but consumers key on `request_id`.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Protocol version the peer wrote this frame with.
    pub version: u8,
    /// Correlates the frame with one logical call on its connection.
    pub request_id: u32,
    /// What this frame means for the exchange.
    pub frame_type: FrameType,
    /// Service/method identifier, e.g. `"UserService/GetUser"`.
    pub method: String,
    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame at the current protocol version.
    pub fn new(
        request_id: u32,
        frame_type: FrameType,
        method: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            request_id,
            frame_type,
            method: method.into(),
            payload: payload.into(),
        }
    }

    /// Total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.method.len() + self.payload.len()
    }
}

/// Encode a frame into the wire format, appending to `dst`.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let method = frame.method.as_bytes();
    if method.len() > u32::MAX as usize {
        return Err(FrameError::FieldTooLarge {
            size: method.len(),
            max: u32::MAX as usize,
        });
    }
    if frame.payload.len() > u32::MAX as usize {
        return Err(FrameError::FieldTooLarge {
            size: frame.payload.len(),
            max: u32::MAX as usize,
        });
    }

    dst.reserve(frame.wire_size());
    dst.put_u8(frame.version);
    dst.put_u32(frame.request_id);
    dst.put_u8(frame.frame_type.as_wire());
    dst.put_u32(method.len() as u32);
    dst.put_slice(method);
    dst.put_u32(frame.payload.len() as u32);
    dst.put_slice(&frame.payload);
    Ok(())
}

/// Decode one frame from the front of `src`.
///
/// Returns `Ok(None)` if the buffer does not yet contain a complete frame.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Cannot even read the fixed fields
    }

    let method_len = u32::from_be_bytes(src[6..10].try_into().unwrap()) as usize;
    if src.len() < HEADER_SIZE + method_len {
        return Ok(None); // payloadLen not buffered yet
    }

    let payload_len_offset = 10 + method_len;
    let payload_len =
        u32::from_be_bytes(src[payload_len_offset..payload_len_offset + 4].try_into().unwrap())
            as usize;
    if src.len() < HEADER_SIZE + method_len + payload_len {
        return Ok(None); // Need more data
    }

    let version = src[0];
    let request_id = u32::from_be_bytes(src[1..5].try_into().unwrap());
    let type_byte = src[5];
    let frame_type =
        FrameType::from_wire(type_byte).ok_or(FrameError::UnknownFrameType(type_byte))?;

    src.advance(10);
    let method_bytes = src.split_to(method_len);
    // Conforming peers always write valid UTF-8; decode lossily so a rogue
    // method name cannot abort the stream.
    let method = String::from_utf8_lossy(&method_bytes).into_owned();
    src.advance(4);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame {
        version,
        request_id,
        frame_type,
        method,
        payload,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(frame: Frame) -> Frame {
        let mut buf = BytesMut::new();
        encode_frame(&frame, &mut buf).unwrap();
        assert_eq!(buf.len(), frame.wire_size());
        let decoded = decode_frame(&mut buf).unwrap().unwrap();
        assert!(buf.is_empty());
        decoded
    }

    #[test]
    fn encode_decode_roundtrip() {
        let frame = Frame::new(7, FrameType::Unary, "UserService/GetUser", &b"abc"[..]);
        let decoded = roundtrip(frame);

        assert_eq!(decoded.version, PROTOCOL_VERSION);
        assert_eq!(decoded.request_id, 7);
        assert_eq!(decoded.frame_type, FrameType::Unary);
        assert_eq!(decoded.method, "UserService/GetUser");
        assert_eq!(decoded.payload.as_ref(), b"abc");
    }

    #[test]
    fn roundtrip_every_frame_type() {
        for frame_type in [
            FrameType::Unary,
            FrameType::StreamChunk,
            FrameType::StreamEnd,
            FrameType::Error,
        ] {
            let decoded = roundtrip(Frame::new(1, frame_type, "Svc/M", &b"p"[..]));
            assert_eq!(decoded.frame_type, frame_type);
        }
    }

    #[test]
    fn roundtrip_empty_method_and_payload() {
        let decoded = roundtrip(Frame::new(0, FrameType::StreamEnd, "", &b""[..]));
        assert_eq!(decoded.request_id, 0);
        assert!(decoded.method.is_empty());
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn roundtrip_large_payload() {
        let payload = vec![0xAB; 128 * 1024];
        let decoded = roundtrip(Frame::new(9, FrameType::StreamChunk, "Bulk/Data", payload.clone()));
        assert_eq!(decoded.payload.as_ref(), payload.as_slice());
    }

    #[test]
    fn wire_layout_is_big_endian() {
        let mut buf = BytesMut::new();
        encode_frame(
            &Frame::new(0x01020304, FrameType::Error, "ab", &b"xyz"[..]),
            &mut buf,
        )
        .unwrap();

        assert_eq!(buf[0], PROTOCOL_VERSION);
        assert_eq!(&buf[1..5], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(buf[5], 3); // ERROR
        assert_eq!(&buf[6..10], &[0, 0, 0, 2]);
        assert_eq!(&buf[10..12], b"ab");
        assert_eq!(&buf[12..16], &[0, 0, 0, 3]);
        assert_eq!(&buf[16..19], b"xyz");
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&[PROTOCOL_VERSION, 0, 0, 0][..]);
        assert!(decode_frame(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 4, "incomplete decode must not consume bytes");
    }

    #[test]
    fn decode_incomplete_method() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::new(1, FrameType::Unary, "Svc/Method", &b""[..]), &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 3); // Cut inside the method bytes
        assert!(decode_frame(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::new(1, FrameType::Unary, "M", &b"hello"[..]), &mut buf).unwrap();
        buf.truncate(buf.len() - 2);
        assert!(decode_frame(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_unknown_frame_type() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::new(1, FrameType::Unary, "M", &b""[..]), &mut buf).unwrap();
        buf[5] = 9;
        let result = decode_frame(&mut buf);
        assert!(matches!(result, Err(FrameError::UnknownFrameType(9))));
    }

    #[test]
    fn decode_accepts_future_version() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::new(1, FrameType::Unary, "M", &b"p"[..]), &mut buf).unwrap();
        buf[0] = 42;
        let decoded = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.version, 42);
        assert_eq!(decoded.payload.as_ref(), b"p");
    }

    #[test]
    fn decode_multiple_frames_in_order() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::new(1, FrameType::Unary, "A", &b"first"[..]), &mut buf).unwrap();
        encode_frame(&Frame::new(2, FrameType::Unary, "B", &b"second"[..]), &mut buf).unwrap();

        let f1 = decode_frame(&mut buf).unwrap().unwrap();
        let f2 = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!((f1.request_id, f1.payload.as_ref()), (1, b"first".as_ref()));
        assert_eq!((f2.request_id, f2.payload.as_ref()), (2, b"second".as_ref()));
        assert!(buf.is_empty());
    }
}
