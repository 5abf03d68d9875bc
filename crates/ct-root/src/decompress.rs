//! ROOT compression blocks.
//!
//! Compressed objects are a sequence of blocks, each with a 9-byte header:
//! ```text
//! bytes 0-1:  algorithm tag ("ZL", "L4", "ZS", "XZ")
//! byte  2:    method
//! bytes 3-5:  compressed size   (little-endian u24)
//! bytes 6-8:  uncompressed size (little-endian u24)
//! ```

use std::io::Read;

use crate::error::{Result, RootError};

const BLOCK_HEADER_LEN: usize = 9;
/// ROOT prefixes LZ4 payloads with an xxhash64 checksum.
const LZ4_CHECKSUM_LEN: usize = 8;

/// Decompress a ROOT object into exactly `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    // Each block inflates to at most 2^24 bytes.
    let max_blocks = src.len() / BLOCK_HEADER_LEN + 1;
    let mut out = Vec::with_capacity(expected_len.min(max_blocks << 24));
    let mut offset = 0;

    while out.len() < expected_len {
        let Some(header) = src.get(offset..offset + BLOCK_HEADER_LEN) else {
            break;
        };
        let tag = [header[0], header[1]];
        let c_size = le24(&header[3..6]);
        let u_size = le24(&header[6..9]);
        offset += BLOCK_HEADER_LEN;

        let block = src.get(offset..offset + c_size).ok_or_else(|| {
            RootError::Decompression(format!(
                "block claims {c_size} compressed bytes, {} remain",
                src.len().saturating_sub(offset)
            ))
        })?;

        let before = out.len();
        match &tag {
            b"ZL" => inflate_zlib(block, &mut out)?,
            b"L4" => inflate_lz4(block, u_size, &mut out)?,
            b"ZS" => inflate_zstd(block, &mut out)?,
            b"XZ" => inflate_xz(block, &mut out)?,
            _ => {
                return Err(RootError::Decompression(format!(
                    "unsupported compression algorithm {:?}",
                    String::from_utf8_lossy(&tag)
                )));
            }
        }
        if out.len() - before != u_size {
            return Err(RootError::Decompression(format!(
                "block inflated to {} bytes, header says {u_size}",
                out.len() - before
            )));
        }
        offset += c_size;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "decompressed {} bytes, expected {expected_len}",
            out.len()
        )));
    }
    Ok(out)
}

fn inflate_zlib(block: &[u8], out: &mut Vec<u8>) -> Result<()> {
    flate2::read::ZlibDecoder::new(block)
        .read_to_end(out)
        .map_err(|e| RootError::Decompression(format!("zlib: {e}")))?;
    Ok(())
}

fn inflate_lz4(block: &[u8], u_size: usize, out: &mut Vec<u8>) -> Result<()> {
    let payload = block.get(LZ4_CHECKSUM_LEN..).ok_or_else(|| {
        RootError::Decompression("LZ4 block shorter than its checksum header".into())
    })?;
    let decoded = lz4_flex::block::decompress(payload, u_size)
        .map_err(|e| RootError::Decompression(format!("lz4: {e}")))?;
    out.extend_from_slice(&decoded);
    Ok(())
}

fn inflate_zstd(block: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let mut src = block;
    let mut decoder = ruzstd::decoding::StreamingDecoder::new(&mut src)
        .map_err(|e| RootError::Decompression(format!("zstd: {e}")))?;
    decoder.read_to_end(out).map_err(|e| RootError::Decompression(format!("zstd: {e}")))?;
    Ok(())
}

fn inflate_xz(block: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let mut input = std::io::BufReader::new(block);
    lzma_rs::xz_decompress(&mut input, out)
        .map_err(|e| RootError::Decompression(format!("xz: {e}")))
}

fn le24(b: &[u8]) -> usize {
    b[0] as usize | (b[1] as usize) << 8 | (b[2] as usize) << 16
}

/// Wrap already-compressed bytes in a ROOT block header.
#[cfg(any(test, feature = "fixture"))]
pub(crate) fn root_block(tag: &[u8; 2], method: u8, compressed: &[u8], u_len: usize) -> Vec<u8> {
    let mut block = Vec::with_capacity(BLOCK_HEADER_LEN + compressed.len());
    block.extend_from_slice(tag);
    block.push(method);
    block.extend_from_slice(&(compressed.len() as u32).to_le_bytes()[..3]);
    block.extend_from_slice(&(u_len as u32).to_le_bytes()[..3]);
    block.extend_from_slice(compressed);
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &[u8] = b"BPIX barycentre x y z, repeated: AAAAAAAAAAAAAAAAAAAAAAAA";

    #[test]
    fn le24_reads_little_endian() {
        assert_eq!(le24(&[0x10, 0x00, 0x00]), 16);
        assert_eq!(le24(&[0x00, 0x01, 0x00]), 256);
        assert_eq!(le24(&[0xff, 0xff, 0xff]), 0xFF_FFFF);
    }

    #[test]
    fn zlib_block() {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(TEXT).unwrap();
        let block = root_block(b"ZL", 8, &enc.finish().unwrap(), TEXT.len());
        assert_eq!(decompress(&block, TEXT.len()).unwrap(), TEXT);
    }

    #[test]
    fn lz4_block_skips_checksum() {
        let mut payload = vec![0u8; LZ4_CHECKSUM_LEN];
        payload.extend(lz4_flex::block::compress(TEXT));
        let block = root_block(b"L4", 4, &payload, TEXT.len());
        assert_eq!(decompress(&block, TEXT.len()).unwrap(), TEXT);
    }

    #[test]
    fn zstd_block() {
        let compressed =
            ruzstd::encoding::compress_to_vec(TEXT, ruzstd::encoding::CompressionLevel::Fastest);
        let block = root_block(b"ZS", 5, &compressed, TEXT.len());
        assert_eq!(decompress(&block, TEXT.len()).unwrap(), TEXT);
    }

    #[test]
    fn xz_block() {
        let mut compressed = Vec::new();
        lzma_rs::xz_compress(&mut std::io::BufReader::new(TEXT), &mut compressed).unwrap();
        let block = root_block(b"XZ", 7, &compressed, TEXT.len());
        assert_eq!(decompress(&block, TEXT.len()).unwrap(), TEXT);
    }

    #[test]
    fn multi_block_objects_are_concatenated() {
        let half = TEXT.len() / 2;
        let mut src = Vec::new();
        for part in [&TEXT[..half], &TEXT[half..]] {
            let mut payload = vec![0u8; LZ4_CHECKSUM_LEN];
            payload.extend(lz4_flex::block::compress(part));
            src.extend(root_block(b"L4", 4, &payload, part.len()));
        }
        assert_eq!(decompress(&src, TEXT.len()).unwrap(), TEXT);
    }

    #[test]
    fn unknown_tag_and_short_output_fail() {
        let block = root_block(b"QQ", 0, &[1, 2, 3], 3);
        assert!(matches!(decompress(&block, 3), Err(RootError::Decompression(_))));
        assert!(matches!(decompress(&[], 10), Err(RootError::Decompression(_))));
    }
}
