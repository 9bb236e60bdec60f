//! Wire-format definitions for the file-transfer protocol.
//!
//! Three kinds of datagram cross the wire:
//! - a **segment** carrying one slice of the source file (sender → receiver),
//! - a **cumulative acknowledgment** (receiver → sender),
//! - the **handshake name**, a NUL-terminated file name echoed back verbatim.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Segment format
//!
//! All integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                                                               |
//! +                   Sequence Offset (64 bits)                   +
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   Payload Length (32 bits)                    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                                                               |
//! +                   Total File Size (64 bits)                   +
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload ...                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 20 bytes.
//!
//! # Acknowledgment format
//!
//! A single 64-bit big-endian offset ([`ACK_LEN`] bytes): every byte before it
//! has been received.

/// Byte length of the fixed-size segment header.
pub const HEADER_LEN: usize = 20;

/// Byte length of an encoded acknowledgment.
pub const ACK_LEN: usize = 8;

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM: usize = 65_507;

const OFF_SEQ: usize = 0;
const OFF_PAYLOAD_LEN: usize = 8;
const OFF_TOTAL: usize = 12;

/// One slice of the source file.
///
/// Segments are immutable once built; retransmission re-sends the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Byte offset of the first payload byte within the file.
    pub offset: u64,
    /// Size of the whole file, repeated in every segment.
    pub total_size: u64,
    pub payload: Vec<u8>,
}

impl Segment {
    pub fn new(offset: u64, total_size: u64, payload: Vec<u8>) -> Self {
        Self {
            offset,
            total_size,
            payload,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Offset of the first byte *after* this segment.
    pub fn end(&self) -> u64 {
        self.offset + self.len()
    }

    /// Serialise this segment into a newly allocated datagram.
    ///
    /// The payload-length field is computed from the actual payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN + self.payload.len()];

        buf[OFF_SEQ..OFF_SEQ + 8].copy_from_slice(&self.offset.to_be_bytes());
        buf[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 4]
            .copy_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf[OFF_TOTAL..OFF_TOTAL + 8].copy_from_slice(&self.total_size.to_be_bytes());
        buf[HEADER_LEN..].copy_from_slice(&self.payload);

        buf
    }

    /// Parse a [`Segment`] from a raw datagram.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`HEADER_LEN`],
    /// - the payload-length field disagrees with `buf.len()`, or
    /// - the payload would extend past the advertised file size.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::BufferTooShort);
        }

        let offset = read_u64(&buf[OFF_SEQ..OFF_SEQ + 8]);
        let payload_len = u32::from_be_bytes([
            buf[OFF_PAYLOAD_LEN],
            buf[OFF_PAYLOAD_LEN + 1],
            buf[OFF_PAYLOAD_LEN + 2],
            buf[OFF_PAYLOAD_LEN + 3],
        ]);
        let total_size = read_u64(&buf[OFF_TOTAL..OFF_TOTAL + 8]);

        if buf.len() != HEADER_LEN + payload_len as usize {
            return Err(PacketError::LengthMismatch);
        }
        match offset.checked_add(u64::from(payload_len)) {
            Some(end) if end <= total_size => {}
            _ => return Err(PacketError::OutOfRange),
        }

        Ok(Segment {
            offset,
            total_size,
            payload: buf[HEADER_LEN..].to_vec(),
        })
    }
}

/// Encode a cumulative acknowledgment for `offset`.
pub fn encode_ack(offset: u64) -> [u8; ACK_LEN] {
    offset.to_be_bytes()
}

/// Decode a cumulative acknowledgment.
///
/// Anything other than exactly [`ACK_LEN`] bytes is rejected.
pub fn decode_ack(buf: &[u8]) -> Result<u64, PacketError> {
    if buf.len() != ACK_LEN {
        return Err(PacketError::AckLength(buf.len()));
    }
    Ok(read_u64(buf))
}

/// Build the handshake datagram: the name followed by a NUL byte.
pub fn encode_name(name: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(name.len() + 1);
    buf.extend_from_slice(name.as_bytes());
    buf.push(0);
    buf
}

/// `true` if `echo` is the peer repeating `name`, with or without the
/// terminating NUL.
pub fn is_name_echo(echo: &[u8], name: &str) -> bool {
    let echo = echo.strip_suffix(&[0]).unwrap_or(echo);
    echo == name.as_bytes()
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(raw)
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size.
    BufferTooShort,
    /// Payload-length field does not match the actual remaining bytes.
    LengthMismatch,
    /// Payload extends beyond the advertised file size.
    OutOfRange,
    /// Acknowledgment datagram of the wrong size.
    AckLength(usize),
}

impl std::fmt::Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketError::BufferTooShort => write!(f, "buffer too short to contain a header"),
            PacketError::LengthMismatch => {
                write!(f, "payload length field does not match remaining bytes")
            }
            PacketError::OutOfRange => write!(f, "payload extends past the file size"),
            PacketError::AckLength(n) => {
                write!(f, "acknowledgment is {n} bytes, expected {ACK_LEN}")
            }
        }
    }
}

impl std::error::Error for PacketError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let seg = Segment::new(4096, 10_000, b"hello".to_vec());
        let decoded = Segment::decode(&seg.encode()).unwrap();
        assert_eq!(decoded, seg);
        assert_eq!(decoded.end(), 4101);
    }

    #[test]
    fn header_fields_big_endian_on_wire() {
        let bytes = Segment::new(0x0102_0304_0506_0708, u64::MAX, b"ab".to_vec()).encode();
        assert_eq!(&bytes[OFF_SEQ..OFF_SEQ + 8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 4], &[0, 0, 0, 2]);
        assert_eq!(bytes.len(), HEADER_LEN + 2);
    }

    #[test]
    fn decode_short_header_returns_error() {
        assert_eq!(
            Segment::decode(&[0u8; HEADER_LEN - 1]),
            Err(PacketError::BufferTooShort)
        );
    }

    #[test]
    fn decode_truncated_payload_returns_error() {
        let mut bytes = Segment::new(0, 100, b"data".to_vec()).encode();
        bytes.pop();
        assert_eq!(Segment::decode(&bytes), Err(PacketError::LengthMismatch));
    }

    #[test]
    fn decode_payload_past_file_size_returns_error() {
        let bytes = Segment::new(98, 100, b"data".to_vec()).encode();
        assert_eq!(Segment::decode(&bytes), Err(PacketError::OutOfRange));
    }

    #[test]
    fn ack_is_fixed_width() {
        assert_eq!(decode_ack(&encode_ack(10_000)), Ok(10_000));
        assert_eq!(decode_ack(&[0u8; 4]), Err(PacketError::AckLength(4)));
        assert_eq!(decode_ack(&[0u8; 9]), Err(PacketError::AckLength(9)));
    }

    #[test]
    fn name_is_nul_terminated() {
        assert_eq!(encode_name("a.txt"), b"a.txt\0");
    }

    #[test]
    fn name_echo_accepts_exact_bytes_only() {
        assert!(is_name_echo(b"a.txt\0", "a.txt"));
        assert!(is_name_echo(b"a.txt", "a.txt"));
        assert!(!is_name_echo(b"a.tx", "a.txt"));
        assert!(!is_name_echo(b"a.txt\0\0", "a.txt"));
        assert!(!is_name_echo(b"b.txt\0", "a.txt"));
    }
}
