//! Cursor over ROOT's big-endian streamer encoding.

use crate::error::{Result, RootError};

/// `kByteCountMask`: set on the leading u32 of objects streamed with a byte count.
pub(crate) const K_BYTE_COUNT_MASK: u32 = 0x4000_0000;

/// `TObject::kIsReferenced`: a 2-byte process id follows the TObject header.
const K_IS_REFERENCED: u32 = 1 << 4;

macro_rules! read_be {
    ($($name:ident -> $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Read a big-endian `", stringify!($ty), "`.")]
            pub fn $name(&mut self) -> Result<$ty> {
                const N: usize = std::mem::size_of::<$ty>();
                let b = self.read_bytes(N)?;
                let mut arr = [0u8; N];
                arr.copy_from_slice(b);
                Ok(<$ty>::from_be_bytes(arr))
            }
        )*
    };
}

/// A cursor-based reader over a byte slice.
pub struct RBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RBuffer<'a> {
    /// Reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reader positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Set read position absolutely.
    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Skip `n` bytes forward.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read `n` raw bytes, advancing the cursor.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a one-byte boolean.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    read_be! {
        read_u16 -> u16,
        read_i16 -> i16,
        read_u32 -> u32,
        read_i32 -> i32,
        read_u64 -> u64,
        read_i64 -> i64,
        read_f32 -> f32,
        read_f64 -> f64,
    }

    /// Read a ROOT `TString`: a length byte (or 255 + u32 length), then bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let first = self.read_u8()?;
        let len = if first == 255 { self.read_u32()? as usize } else { first as usize };
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a NUL-terminated C string (class names in object tags).
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let nul = rest.iter().position(|&b| b == 0).ok_or(RootError::BufferUnderflow {
            offset: self.pos,
            need: rest.len() + 1,
            have: rest.len(),
        })?;
        let s = String::from_utf8_lossy(&rest[..nul]).into_owned();
        self.pos += nul + 1;
        Ok(s)
    }

    /// Read a streamer version header.
    ///
    /// Returns `(version, end_pos)`, where `end_pos` is the absolute position
    /// just past the object when a byte count is present.
    pub fn read_version(&mut self) -> Result<(u16, Option<usize>)> {
        let start = self.pos;
        let raw = self.read_u32()?;
        if raw & K_BYTE_COUNT_MASK != 0 {
            let byte_count = (raw & !K_BYTE_COUNT_MASK) as usize;
            let version = self.read_u16()?;
            Ok((version, Some(start + 4 + byte_count)))
        } else {
            // No byte count: the first two bytes were the version.
            self.pos = start + 2;
            Ok(((raw >> 16) as u16, None))
        }
    }

    /// Skip a versioned object that carries a byte count.
    pub fn skip_versioned(&mut self, what: &str) -> Result<()> {
        match self.read_version()? {
            (_, Some(end)) => {
                self.set_pos(end);
                Ok(())
            }
            (_, None) => Err(RootError::Deserialization(format!("{what} missing byte count"))),
        }
    }

    /// Read a `TObject` header and return its `fBits`.
    pub fn read_tobject(&mut self) -> Result<u32> {
        let _version = self.read_u16()?;
        let _unique_id = self.read_u32()?;
        let bits = self.read_u32()?;
        if bits & K_IS_REFERENCED != 0 {
            self.skip(2)?;
        }
        Ok(bits)
    }

    /// Read a `TNamed` (versioned TObject + name + title).
    pub fn read_tnamed(&mut self) -> Result<(String, String)> {
        let (_ver, end) = self.read_version()?;
        self.read_tobject()?;
        let name = self.read_string()?;
        let title = self.read_string()?;
        if let Some(end) = end {
            self.set_pos(end);
        }
        Ok((name, title))
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.pos.checked_add(n).is_none_or(|end| end > self.data.len()) {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: n,
                have: self.data.len().saturating_sub(self.pos),
            });
        }
        Ok(())
    }
}
