use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{Envelope, MAX_MESSAGE_SIZE};

const LEN_SIZE: usize = 4;
const TAG_SIZE: usize = 1;
const CRC_SIZE: usize = 4;

/// Codec for ByzCoin client frames.
pub struct BzcCodec;

impl BzcCodec {
    /// Encode with framing: `[4 bytes len][1 byte tag][payload][4 bytes crc32]`.
    ///
    /// `len` counts the tag and payload; the CRC covers the same bytes.
    pub fn encode(envelope: &Envelope) -> ProtocolResult<Vec<u8>> {
        let payload = Self::encode_payload(envelope)?;
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let len = (TAG_SIZE + payload.len()) as u32;
        let mut buf = Vec::with_capacity(LEN_SIZE + TAG_SIZE + payload.len() + CRC_SIZE);
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(envelope.message.type_tag());
        buf.extend_from_slice(&payload);
        let crc = crc32fast::hash(&buf[LEN_SIZE..]);
        buf.extend_from_slice(&crc.to_be_bytes());
        Ok(buf)
    }

    /// Decode one frame. Returns (envelope, bytes_consumed).
    pub fn decode(data: &[u8]) -> ProtocolResult<(Envelope, usize)> {
        if data.len() < LEN_SIZE + TAG_SIZE + CRC_SIZE {
            return Err(ProtocolError::FramingError("too short".into()));
        }
        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if len < TAG_SIZE {
            return Err(ProtocolError::FramingError("zero-length frame".into()));
        }
        if len - TAG_SIZE > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: len - TAG_SIZE,
                max: MAX_MESSAGE_SIZE,
            });
        }
        let body_end = LEN_SIZE + len;
        let total = body_end + CRC_SIZE;
        if data.len() < total {
            return Err(ProtocolError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }

        let expected = u32::from_be_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        let actual = crc32fast::hash(&data[LEN_SIZE..body_end]);
        if actual != expected {
            tracing::warn!(expected, actual, "frame checksum mismatch");
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        let tag = data[LEN_SIZE];
        let envelope = Self::decode_payload(&data[LEN_SIZE + TAG_SIZE..body_end])?;
        if envelope.message.type_tag() != tag {
            return Err(ProtocolError::TagMismatch {
                tag,
                payload: envelope.message.type_tag(),
            });
        }
        Ok((envelope, total))
    }

    /// Encode payload only (no framing).
    pub fn encode_payload(envelope: &Envelope) -> ProtocolResult<Vec<u8>> {
        bincode::serialize(envelope).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Decode payload only (no framing).
    pub fn decode_payload(data: &[u8]) -> ProtocolResult<Envelope> {
        bincode::deserialize(data).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}
