//! Delta replay.
//!
//! A delta is two little-endian base-128 sizes (base, result) followed by
//! instructions: a copy (`0x80` set) names an offset and length in the base,
//! an insert (`0x01..=0x7f`) carries that many literal bytes. Opcode `0` is
//! reserved.

use crate::error::{PackError, PackResult};

/// Copy length encoded as zero means this many bytes.
const DEFAULT_COPY_LEN: usize = 0x10000;

/// Read the base and result sizes from a delta's header.
pub fn delta_sizes(delta: &[u8]) -> PackResult<(u64, u64)> {
    let mut pos = 0;
    let base = read_size(delta, &mut pos)?;
    let result = read_size(delta, &mut pos)?;
    Ok((base, result))
}

/// Apply `delta` to `base`, producing the target object bytes.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> PackResult<Vec<u8>> {
    let mut pos = 0;
    let base_size = read_size(delta, &mut pos)?;
    if base_size != base.len() as u64 {
        return Err(PackError::InvalidDelta(format!(
            "base size {base_size} does not match base length {}",
            base.len()
        )));
    }
    let result_size = usize::try_from(read_size(delta, &mut pos)?)
        .map_err(|_| PackError::InvalidDelta("result size overflows".into()))?;

    let mut out = Vec::with_capacity(result_size);
    while pos < delta.len() {
        let op = delta[pos];
        pos += 1;
        if op & 0x80 != 0 {
            let mut offset = 0usize;
            for i in 0..4 {
                if op & (1 << i) != 0 {
                    offset |= usize::from(next_byte(delta, &mut pos)?) << (8 * i);
                }
            }
            let mut len = 0usize;
            for i in 0..3 {
                if op & (0x10 << i) != 0 {
                    len |= usize::from(next_byte(delta, &mut pos)?) << (8 * i);
                }
            }
            if len == 0 {
                len = DEFAULT_COPY_LEN;
            }
            let chunk = offset
                .checked_add(len)
                .and_then(|end| base.get(offset..end))
                .ok_or_else(|| {
                    PackError::InvalidDelta(format!("copy {offset}+{len} outside base"))
                })?;
            out.extend_from_slice(chunk);
        } else if op != 0 {
            let len = usize::from(op);
            let chunk = delta
                .get(pos..pos + len)
                .ok_or_else(|| PackError::InvalidDelta("truncated insert".into()))?;
            out.extend_from_slice(chunk);
            pos += len;
        } else {
            return Err(PackError::InvalidDelta("reserved opcode 0".into()));
        }
        if out.len() > result_size {
            return Err(PackError::InvalidDelta("result exceeds declared size".into()));
        }
    }

    if out.len() != result_size {
        return Err(PackError::InvalidDelta(format!(
            "result is {} bytes, expected {result_size}",
            out.len()
        )));
    }
    Ok(out)
}

fn next_byte(delta: &[u8], pos: &mut usize) -> PackResult<u8> {
    let byte = *delta
        .get(*pos)
        .ok_or_else(|| PackError::InvalidDelta("truncated instruction".into()))?;
    *pos += 1;
    Ok(byte)
}

fn read_size(delta: &[u8], pos: &mut usize) -> PackResult<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = next_byte(delta, pos)?;
        if shift > 63 {
            return Err(PackError::InvalidDelta("size varint too long".into()));
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
}
