//! Binary framing and typed body cursors.
//!
//! Header layout (24 bytes, all fields big-endian):
//!
//! ```text
//! +--------+---------+---------+--------+-------+--------+-----------+---------+
//! | magic  | version | msgType | opCode | flags | status | requestId | bodyLen |
//! | 4 bytes| 1 byte  | 1 byte  | 2 bytes|2 bytes|2 bytes |  8 bytes  | 4 bytes |
//! +--------+---------+---------+--------+-------+--------+-----------+---------+
//! | body (bodyLen bytes)                                                       |
//! +----------------------------------------------------------------------------+
//! ```
//!
//! One message per datagram. Bytes after the declared body are tolerated and
//! ignored.

use crate::error::ProtocolError;
use crate::message::{Header, Message, MsgType};
use crate::PROTOCOL_VERSION;
use bytes::{BufMut, Bytes, BytesMut};

/// Magic bytes identifying teller frames: "BANK".
pub const MAGIC: [u8; 4] = *b"BANK";

/// Size of the fixed header in bytes (4+1+1+2+2+2+8+4 = 24).
pub const HEADER_SIZE: usize = 24;

impl Message {
    /// Encodes the message into a datagram payload. `bodyLen` is taken from
    /// the actual body.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.body.len());
        buf.put_slice(&MAGIC);
        buf.put_u8(self.header.version);
        buf.put_u8(self.header.msg_type as u8);
        buf.put_u16(self.header.op);
        buf.put_u16(self.header.flags);
        buf.put_u16(self.header.status);
        buf.put_u64(self.header.request_id);
        buf.put_u32(self.body.len() as u32);
        buf.put_slice(&self.body);
        buf.freeze()
    }

    /// Decodes one datagram. Side-effect free; rejects on bad magic, bad
    /// version, a truncated header, or a body shorter than `bodyLen`.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        if raw.len() < HEADER_SIZE {
            return Err(ProtocolError::ShortHeader(raw.len()));
        }

        let magic: [u8; 4] = raw[0..4].try_into().unwrap();
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic(magic));
        }

        let version = raw[4];
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let msg_type = MsgType::from_u8(raw[5])?;
        let op = u16::from_be_bytes([raw[6], raw[7]]);
        let flags = u16::from_be_bytes([raw[8], raw[9]]);
        let status = u16::from_be_bytes([raw[10], raw[11]]);
        let request_id = u64::from_be_bytes(raw[12..20].try_into().unwrap());
        let body_len = u32::from_be_bytes(raw[20..24].try_into().unwrap());

        let available = raw.len() - HEADER_SIZE;
        if body_len as usize > available {
            return Err(ProtocolError::BodyTruncated {
                declared: body_len,
                available,
            });
        }

        Ok(Self {
            header: Header {
                version,
                msg_type,
                op,
                flags,
                status,
                request_id,
            },
            body: Bytes::copy_from_slice(&raw[HEADER_SIZE..HEADER_SIZE + body_len as usize]),
        })
    }
}

/// Appends typed fields to a message body. Fields are concatenated in call
/// order with no padding.
#[derive(Debug, Default)]
pub struct BodyWriter {
    buf: BytesMut,
}

impl BodyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16(v);
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32(v);
        self
    }

    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.put_u64(v);
        self
    }

    pub fn put_i32(&mut self, v: i32) -> &mut Self {
        self.buf.put_i32(v);
        self
    }

    /// Doubles travel as their IEEE-754 bit pattern in a big-endian u64.
    pub fn put_f64(&mut self, v: f64) -> &mut Self {
        self.buf.put_u64(v.to_bits());
        self
    }

    /// u16 length prefix followed by the raw bytes.
    pub fn put_string(&mut self, s: &str) -> Result<&mut Self, ProtocolError> {
        if s.len() > u16::MAX as usize {
            return Err(ProtocolError::StringTooLong(s.len()));
        }
        self.buf.put_u16(s.len() as u16);
        self.buf.put_slice(s.as_bytes());
        Ok(self)
    }

    /// Exactly 16 bytes, zero-padded on the right; longer input is truncated.
    pub fn put_password(&mut self, s: &str) -> &mut Self {
        let bytes = s.as_bytes();
        let n = bytes.len().min(16);
        self.buf.put_slice(&bytes[..n]);
        self.buf.put_bytes(0, 16 - n);
        self
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reads typed fields from a message body, advancing an explicit cursor.
/// Every read is bounds-checked; none allocate except the string reads.
#[derive(Debug)]
pub struct BodyReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> BodyReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::ReadPastEnd {
                offset: self.offset,
                wanted: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    pub fn get_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn get_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn get_u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn get_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn get_f64(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_bits(self.get_u64()?))
    }

    pub fn get_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.get_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Reads the fixed 16-byte password slot and strips trailing NULs. A
    /// password that legitimately ends in a zero byte is therefore lossy.
    pub fn get_password(&mut self) -> Result<String, ProtocolError> {
        let slot = self.take(16)?;
        let end = slot.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        String::from_utf8(slot[..end].to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
    }
}
