//! TKey records: the header ROOT puts in front of every stored object.

use crate::error::Result;
use crate::rbuffer::RBuffer;

/// Key versions above this use 64-bit seek pointers.
const LARGE_KEY_VERSION: u16 = 1000;

/// A parsed TKey header.
#[derive(Debug, Clone)]
pub struct Key {
    /// Total bytes on disk: key header plus (compressed) object.
    pub n_bytes: u32,
    /// Key class version.
    pub version: u16,
    /// Uncompressed object length.
    pub obj_len: u32,
    /// Length of the key header itself.
    pub key_len: u16,
    /// Cycle number within the owning directory.
    pub cycle: u16,
    /// Absolute file position of this key.
    pub seek_key: u64,
    /// Class name of the stored object.
    pub class_name: String,
    /// Object name.
    pub name: String,
    /// Object title.
    pub title: String,
}

impl Key {
    /// Read a TKey header at the reader's position.
    pub fn read(r: &mut RBuffer, file_is_large: bool) -> Result<Self> {
        let n_bytes = r.read_u32()?;
        let version = r.read_u16()?;
        let obj_len = r.read_u32()?;
        let _datime = r.read_u32()?;
        let key_len = r.read_u16()?;
        let cycle = r.read_u16()?;

        let seek_key = if version > LARGE_KEY_VERSION || file_is_large {
            let sk = r.read_u64()?;
            let _seek_pdir = r.read_u64()?;
            sk
        } else {
            let sk = r.read_u32()? as u64;
            let _seek_pdir = r.read_u32()?;
            sk
        };

        let class_name = r.read_string()?;
        let name = r.read_string()?;
        let title = r.read_string()?;

        Ok(Key { n_bytes, version, obj_len, key_len, cycle, seek_key, class_name, name, title })
    }

    /// Whether the stored object is compressed.
    pub fn is_compressed(&self) -> bool {
        self.obj_len as usize != self.payload_len()
    }

    /// Bytes following the key header on disk.
    pub fn payload_len(&self) -> usize {
        (self.n_bytes as usize).saturating_sub(self.key_len as usize)
    }

    /// Whether the key points at a (sub)directory.
    pub fn is_directory(&self) -> bool {
        matches!(self.class_name.as_str(), "TDirectory" | "TDirectoryFile")
    }
}

/// Public summary of a key, as shown by listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Object name.
    pub name: String,
    /// Object class name (e.g. "TTree", "TDirectoryFile").
    pub class_name: String,
    /// Object title.
    pub title: String,
    /// Cycle number.
    pub cycle: u16,
}

impl From<&Key> for KeyInfo {
    fn from(key: &Key) -> Self {
        Self {
            name: key.name.clone(),
            class_name: key.class_name.clone(),
            title: key.title.clone(),
            cycle: key.cycle,
        }
    }
}
