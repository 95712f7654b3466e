//! Fixed-width field codec
//!
//! Strings are stored NUL-padded in a fixed number of bytes. The last byte
//! is reserved for the terminator, so a field of width `w` holds at most
//! `w - 1` bytes of text.

use bytes::{Buf, BufMut};

use crate::error::{HashStoreError, Result};

/// Check that `value` fits a NUL-terminated field of `width` bytes
pub(crate) fn check_width(field: &'static str, value: &str, width: usize) -> Result<()> {
    let max = width - 1;
    if value.len() > max {
        return Err(HashStoreError::FieldTooLong { field, max });
    }
    if value.as_bytes().contains(&0) {
        return Err(HashStoreError::Codec(format!(
            "field {} contains a NUL byte",
            field
        )));
    }
    Ok(())
}

/// Write `value` NUL-padded to exactly `width` bytes
pub(crate) fn put_fixed_str<B: BufMut>(
    buf: &mut B,
    field: &'static str,
    value: &str,
    width: usize,
) -> Result<()> {
    check_width(field, value, width)?;
    buf.put_slice(value.as_bytes());
    buf.put_bytes(0, width - value.len());
    Ok(())
}

/// Read a NUL-padded string of exactly `width` bytes
pub(crate) fn get_fixed_str<B: Buf>(buf: &mut B, field: &'static str, width: usize) -> Result<String> {
    if buf.remaining() < width {
        return Err(HashStoreError::Codec(format!(
            "field {} truncated: need {} bytes, have {}",
            field,
            width,
            buf.remaining()
        )));
    }

    let mut raw = vec![0u8; width];
    buf.copy_to_slice(&mut raw);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
    raw.truncate(end);

    String::from_utf8(raw)
        .map_err(|e| HashStoreError::Codec(format!("field {} is not UTF-8: {}", field, e)))
}
