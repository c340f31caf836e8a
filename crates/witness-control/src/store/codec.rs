//! Binary encoding of the pipeline record.
//!
//! Layout: `[stage: u32 LE][var-uint length][utf8 address]`. The length prefix
//! uses the ledger's variable-length integer: values below `0xFD` take one
//! byte, otherwise a marker byte (`0xFD`, `0xFE`, `0xFF`) is followed by a
//! little-endian `u16`, `u32` or `u64`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use witness_ledger::ContractAddress;

use crate::error::{ControlError, ControlResult};
use crate::types::{PipelineState, Stage};

/// Key of the single pipeline record: a one-byte prefix and 32 zero bytes.
pub const STATE_KEY: [u8; 33] = {
    let mut key = [0u8; 33];
    key[0] = 0x01;
    key
};

/// Encode a pipeline record.
#[must_use]
#[allow(clippy::as_conversions)]
pub fn encode_state(state: &PipelineState) -> Bytes {
    let address = state.contract_address.as_str().as_bytes();
    let mut buf = BytesMut::with_capacity(4 + 9 + address.len());
    buf.put_u32_le(state.stage.tag());
    put_var_uint(&mut buf, address.len() as u64);
    buf.put_slice(address);
    buf.freeze()
}

/// Decode a pipeline record.
///
/// Rejects unknown stage tags, non-canonical or truncated lengths, invalid
/// UTF-8 and trailing bytes.
pub fn decode_state(mut raw: &[u8]) -> ControlResult<PipelineState> {
    if raw.remaining() < 4 {
        return Err(decode_error("record shorter than stage tag"));
    }
    let tag = raw.get_u32_le();
    let stage = Stage::from_tag(tag).ok_or_else(|| decode_error(format!("unknown stage {tag}")))?;

    let len = get_var_uint(&mut raw)?;
    let len = usize::try_from(len).map_err(|_| decode_error("address length overflow"))?;
    if raw.remaining() != len {
        return Err(decode_error(format!(
            "address length {len} but {} bytes remain",
            raw.remaining()
        )));
    }

    let address = std::str::from_utf8(raw)
        .map_err(|e| decode_error(format!("address is not UTF-8: {e}")))?;

    Ok(PipelineState::new(stage, ContractAddress::new(address)))
}

// Each arm's range guarantees the narrowing cast is lossless.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn put_var_uint(buf: &mut BytesMut, value: u64) {
    match value {
        0..=0xFC => buf.put_u8(value as u8),
        0xFD..=0xFFFF => {
            buf.put_u8(0xFD);
            buf.put_u16_le(value as u16);
        }
        0x1_0000..=0xFFFF_FFFF => {
            buf.put_u8(0xFE);
            buf.put_u32_le(value as u32);
        }
        _ => {
            buf.put_u8(0xFF);
            buf.put_u64_le(value);
        }
    }
}

fn get_var_uint(raw: &mut &[u8]) -> ControlResult<u64> {
    if !raw.has_remaining() {
        return Err(decode_error("missing length prefix"));
    }

    let (value, min) = match raw.get_u8() {
        0xFD => {
            ensure_remaining(raw, 2)?;
            (u64::from(raw.get_u16_le()), 0xFD)
        }
        0xFE => {
            ensure_remaining(raw, 4)?;
            (u64::from(raw.get_u32_le()), 0x1_0000)
        }
        0xFF => {
            ensure_remaining(raw, 8)?;
            (raw.get_u64_le(), 0x1_0000_0000)
        }
        small => return Ok(u64::from(small)),
    };

    if value < min {
        return Err(decode_error("non-canonical length prefix"));
    }
    Ok(value)
}

fn ensure_remaining(raw: &[u8], n: usize) -> ControlResult<()> {
    if raw.remaining() < n {
        return Err(decode_error("truncated length prefix"));
    }
    Ok(())
}

fn decode_error(msg: impl Into<String>) -> ControlError {
    ControlError::Serialisation(msg.into())
}
