// ── AMS/TCP framing ──
//
// Every AMS/TCP frame is a 6-byte prefix (reserved word + length) followed
// by the 32-byte AMS header and the command payload. All integers are
// little-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::addr::{AmsAddress, AmsNetId};
use crate::error::Error;
use crate::state::AdsState;

pub const AMS_TCP_HEADER_LEN: usize = 6;
pub const AMS_HEADER_LEN: usize = 32;

/// Upper bound accepted for a single frame body; anything larger is
/// treated as a corrupt length prefix.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

pub const CMD_READ_STATE: u16 = 0x0004;

pub const STATE_FLAG_RESPONSE: u16 = 0x0001;
pub const STATE_FLAG_ADS_COMMAND: u16 = 0x0004;

/// Length of a ReadState response payload: result, ADS state, device state.
const READ_STATE_RESPONSE_LEN: usize = 8;

/// The fixed 32-byte header carried by every AMS packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmsHeader {
    pub target: AmsAddress,
    pub source: AmsAddress,
    pub command_id: u16,
    pub state_flags: u16,
    pub error_code: u32,
    pub invoke_id: u32,
}

impl AmsHeader {
    pub fn is_response(&self) -> bool {
        self.state_flags & STATE_FLAG_RESPONSE != 0
    }
}

/// An AMS header with its command payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmsPacket {
    pub header: AmsHeader,
    pub data: Bytes,
}

impl AmsPacket {
    /// Build a ReadState request from `source` to `target`.
    pub fn read_state_request(target: AmsAddress, source: AmsAddress, invoke_id: u32) -> Self {
        Self {
            header: AmsHeader {
                target,
                source,
                command_id: CMD_READ_STATE,
                state_flags: STATE_FLAG_ADS_COMMAND,
                error_code: 0,
                invoke_id,
            },
            data: Bytes::new(),
        }
    }

    /// Serialize into a complete AMS/TCP frame, prefix included.
    pub fn encode(&self) -> Result<BytesMut, Error> {
        let body_len = AMS_HEADER_LEN + self.data.len();
        let data_len = u32::try_from(self.data.len())
            .map_err(|_| Error::protocol("payload exceeds u32 length"))?;
        let frame_len =
            u32::try_from(body_len).map_err(|_| Error::protocol("frame exceeds u32 length"))?;

        let mut buf = BytesMut::with_capacity(AMS_TCP_HEADER_LEN + body_len);
        buf.put_u16_le(0);
        buf.put_u32_le(frame_len);

        let h = &self.header;
        put_address(&mut buf, h.target);
        put_address(&mut buf, h.source);
        buf.put_u16_le(h.command_id);
        buf.put_u16_le(h.state_flags);
        buf.put_u32_le(data_len);
        buf.put_u32_le(h.error_code);
        buf.put_u32_le(h.invoke_id);
        buf.put_slice(&self.data);
        Ok(buf)
    }

    /// Parse a frame body (everything after the 6-byte AMS/TCP prefix).
    pub fn decode(mut body: Bytes) -> Result<Self, Error> {
        if body.len() < AMS_HEADER_LEN {
            return Err(Error::protocol(format!(
                "AMS header truncated: {} of {AMS_HEADER_LEN} bytes",
                body.len()
            )));
        }

        let target = get_address(&mut body);
        let source = get_address(&mut body);
        let command_id = body.get_u16_le();
        let state_flags = body.get_u16_le();
        let data_len = body.get_u32_le() as usize;
        let error_code = body.get_u32_le();
        let invoke_id = body.get_u32_le();

        if body.len() != data_len {
            return Err(Error::protocol(format!(
                "AMS data length mismatch: header says {data_len}, frame carries {}",
                body.len()
            )));
        }

        Ok(Self {
            header: AmsHeader {
                target,
                source,
                command_id,
                state_flags,
                error_code,
                invoke_id,
            },
            data: body,
        })
    }
}

/// Decode the 6-byte AMS/TCP prefix into `(reserved, body_length)`.
pub fn decode_tcp_header(prefix: [u8; AMS_TCP_HEADER_LEN]) -> Result<(u16, usize), Error> {
    let mut buf = &prefix[..];
    let reserved = buf.get_u16_le();
    let len = buf.get_u32_le() as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::protocol(format!(
            "frame length {len} exceeds limit of {MAX_FRAME_LEN}"
        )));
    }
    Ok((reserved, len))
}

/// Decode a ReadState response payload into `(ads_state, device_state)`.
pub fn parse_read_state_response(mut data: Bytes) -> Result<(AdsState, u16), Error> {
    if data.len() < READ_STATE_RESPONSE_LEN {
        return Err(Error::protocol(format!(
            "ReadState response truncated: {} of {READ_STATE_RESPONSE_LEN} bytes",
            data.len()
        )));
    }

    let result = data.get_u32_le();
    if result != 0 {
        return Err(Error::Ads { code: result });
    }

    let raw_state = data.get_u16_le();
    let device_state = data.get_u16_le();
    let ads_state = AdsState::from_repr(raw_state)
        .ok_or_else(|| Error::protocol(format!("unknown ADS state {raw_state}")))?;
    Ok((ads_state, device_state))
}

fn put_address(buf: &mut BytesMut, addr: AmsAddress) {
    buf.put_slice(&addr.net_id.octets());
    buf.put_u16_le(addr.port);
}

fn get_address(buf: &mut Bytes) -> AmsAddress {
    let mut octets = [0u8; 6];
    buf.copy_to_slice(&mut octets);
    let port = buf.get_u16_le();
    AmsAddress::new(AmsNetId::new(octets), port)
}
