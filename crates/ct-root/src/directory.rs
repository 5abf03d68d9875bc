//! TDirectory headers and key lists.

use crate::error::{Result, RootError};
use crate::key::Key;
use crate::rbuffer::RBuffer;

/// Directory versions above this use 64-bit seek pointers.
const LARGE_DIR_VERSION: u16 = 1000;

/// The seek information held in a TDirectory streamer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DirHeader {
    pub seek_keys: u64,
    pub nbytes_keys: u32,
}

impl DirHeader {
    /// Parse the TDirectory streamer at the reader's position.
    pub(crate) fn read(r: &mut RBuffer) -> Result<Self> {
        let version = r.read_u16()?;
        let _datime_c = r.read_u32()?;
        let _datime_m = r.read_u32()?;
        let nbytes_keys = r.read_u32()?;
        let _nbytes_name = r.read_u32()?;
        let seek_keys = if version > LARGE_DIR_VERSION {
            let _seek_dir = r.read_u64()?;
            let _seek_parent = r.read_u64()?;
            r.read_u64()?
        } else {
            let _seek_dir = r.read_u32()?;
            let _seek_parent = r.read_u32()?;
            r.read_u32()? as u64
        };
        Ok(Self { seek_keys, nbytes_keys })
    }
}

/// A directory: the ordered list of its keys.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    keys: Vec<Key>,
}

impl Directory {
    /// Read the key list a directory header points to.
    ///
    /// The list is itself stored behind a TKey, followed by an `i32` count
    /// and that many key headers.
    pub(crate) fn read_key_list(file: &[u8], header: DirHeader, is_large: bool) -> Result<Self> {
        if header.seek_keys == 0 {
            return Ok(Self::default());
        }
        let start = usize::try_from(header.seek_keys).map_err(|_| {
            RootError::Deserialization(format!("seek_keys too large: {}", header.seek_keys))
        })?;
        let mut r = RBuffer::at(file, start);
        let list_key = Key::read(&mut r, is_large)?;
        r.set_pos(start + list_key.key_len as usize);

        let nkeys = r.read_i32()?;
        if nkeys < 0 {
            return Err(RootError::Deserialization(format!("negative key count {nkeys}")));
        }
        let keys = (0..nkeys).map(|_| Key::read(&mut r, is_large)).collect::<Result<Vec<_>>>()?;
        tracing::trace!(nkeys, nbytes = header.nbytes_keys, "read key list");
        Ok(Self { keys })
    }

    /// All keys, in file order (every cycle included).
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Find a key by name, preferring the highest cycle.
    pub fn find_key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().filter(|k| k.name == name).max_by_key(|k| k.cycle)
    }
}
