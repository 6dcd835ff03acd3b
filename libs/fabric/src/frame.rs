//! Multipart messages packed into a single transport frame
//!
//! Layout: `u32` part count, then for each part a `u32` length and the bytes.
//! All integers are big-endian.

use crate::error::{Error, Result};

pub fn encode_multipart(parts: &[&[u8]]) -> Vec<u8> {
    let size = 4 + parts.iter().map(|p| 4 + p.len()).sum::<usize>();
    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&(parts.len() as u32).to_be_bytes());
    for part in parts {
        buf.extend_from_slice(&(part.len() as u32).to_be_bytes());
        buf.extend_from_slice(part);
    }
    buf
}

pub fn decode_multipart(bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut rest = bytes;
    let count = take_u32(&mut rest)? as usize;
    // Every part needs at least its length prefix
    if count > rest.len() / 4 {
        return Err(Error::InvalidFrame(format!(
            "{} parts cannot fit in {} bytes",
            count,
            rest.len()
        )));
    }

    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        let len = take_u32(&mut rest)? as usize;
        if len > rest.len() {
            return Err(Error::InvalidFrame(format!(
                "Part of {} bytes overruns frame",
                len
            )));
        }
        let (part, tail) = rest.split_at(len);
        parts.push(part.to_vec());
        rest = tail;
    }

    if !rest.is_empty() {
        return Err(Error::InvalidFrame(format!(
            "{} trailing bytes after last part",
            rest.len()
        )));
    }
    Ok(parts)
}

fn take_u32(rest: &mut &[u8]) -> Result<u32> {
    if rest.len() < 4 {
        return Err(Error::InvalidFrame("Truncated length prefix".to_string()));
    }
    let (head, tail) = rest.split_at(4);
    *rest = tail;
    Ok(u32::from_be_bytes([head[0], head[1], head[2], head[3]]))
}
