//! TBasket records: the compressed data blocks of a branch.

use crate::decompress::decompress;
use crate::error::{Result, RootError};
use crate::key::Key;
use crate::rbuffer::RBuffer;

/// A decompressed basket.
#[derive(Debug, Clone)]
pub struct Basket {
    /// Number of entries stored (`fNevBuf`).
    pub n_entries: usize,
    /// Entry data, with any trailing entry-offset table removed.
    pub data: Vec<u8>,
}

/// Read and decompress the basket whose key starts at `seek`.
///
/// After the regular TKey fields, a basket key carries `fVersion`,
/// `fBufferSize`, `fNevBufSize`, `fNevBuf`, `fLast` and a flag byte.
/// `fLast` marks the end of entry data counted from the key start.
pub fn read_basket(file: &[u8], seek: u64, is_large: bool) -> Result<Basket> {
    let pos = usize::try_from(seek)
        .map_err(|_| RootError::Deserialization(format!("basket seek too large: {seek}")))?;
    let mut r = RBuffer::at(file, pos);
    let key = Key::read(&mut r, is_large)?;

    let _version = r.read_u16()?;
    let _buffer_size = r.read_i32()?;
    let _nev_buf_size = r.read_i32()?;
    let nev_buf = r.read_i32()?;
    let last = r.read_i32()?;
    let _flag = r.read_u8()?;

    let start = pos + key.key_len as usize;
    let end = pos + key.n_bytes as usize;
    let stored = file.get(start..end).ok_or(RootError::BufferUnderflow {
        offset: start,
        need: key.payload_len(),
        have: file.len().saturating_sub(start),
    })?;

    let mut data =
        if key.is_compressed() { decompress(stored, key.obj_len as usize)? } else { stored.to_vec() };

    let data_len = (last.max(0) as usize).saturating_sub(key.key_len as usize);
    if data_len > data.len() {
        return Err(RootError::Deserialization(format!(
            "basket at {pos}: fLast {last} beyond payload of {} bytes",
            data.len()
        )));
    }
    data.truncate(data_len);

    Ok(Basket { n_entries: nev_buf.max(0) as usize, data })
}
