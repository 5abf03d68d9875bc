//! TFile header parsing and the top-level file interface.

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::column::{self, Column};
use crate::decompress::decompress;
use crate::directory::{DirHeader, Directory};
use crate::error::{Result, RootError};
use crate::key::{Key, KeyInfo};
use crate::objects;
use crate::rbuffer::RBuffer;
use crate::tree::Tree;

const ROOT_MAGIC: &[u8; 4] = b"root";
const MIN_FILE_LEN: usize = 64;
/// File format versions from this one on use 64-bit seek pointers.
const LARGE_FILE_VERSION: u32 = 1_000_000;

/// File bytes: memory-mapped from disk, or owned (fixtures, `from_bytes`).
enum Bytes {
    Owned(Vec<u8>),
    Mapped(memmap2::Mmap),
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Bytes::Owned(v) => v,
            Bytes::Mapped(m) => m,
        }
    }
}

/// A ROOT file opened for reading.
pub struct RootFile {
    data: Bytes,
    path: PathBuf,
    is_large: bool,
    top: DirHeader,
}

impl RootFile {
    /// Open a file from disk (memory-mapped).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: the mapping is read-only; the file is not expected to be
        // modified while a table is being extracted from it.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::from_data(Bytes::Mapped(mmap), path)
    }

    /// Parse a file held in memory.
    pub fn from_bytes(data: Vec<u8>, path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_data(Bytes::Owned(data), path.into())
    }

    fn from_data(data: Bytes, path: PathBuf) -> Result<Self> {
        if data.len() < MIN_FILE_LEN || &data[..4] != ROOT_MAGIC {
            return Err(RootError::BadMagic);
        }
        let (is_large, top) = parse_header(&data)?;
        tracing::debug!(path = %path.display(), is_large, seek_keys = top.seek_keys, "opened ROOT file");
        Ok(Self { data, path, is_large, top })
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file uses 64-bit seek pointers.
    pub fn is_large(&self) -> bool {
        self.is_large
    }

    /// The top-level directory.
    pub fn top_directory(&self) -> Result<Directory> {
        Directory::read_key_list(&self.data, self.top, self.is_large)
    }

    /// Keys of the top-level directory.
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        Ok(self.top_directory()?.keys().iter().map(KeyInfo::from).collect())
    }

    /// Resolve a `/`-separated directory path; `""` is the top directory.
    pub fn directory(&self, path: &str) -> Result<Directory> {
        let mut dir = self.top_directory()?;
        for part in path.split('/').filter(|s| !s.is_empty()) {
            let key = dir
                .find_key(part)
                .ok_or_else(|| RootError::KeyNotFound(format!("{part} (in path {path})")))?;
            dir = self.subdirectory(key)?;
        }
        Ok(dir)
    }

    /// Open the directory a key points to.
    pub fn subdirectory(&self, key: &Key) -> Result<Directory> {
        if !key.is_directory() {
            return Err(RootError::NotADirectory {
                name: key.name.clone(),
                class_name: key.class_name.clone(),
            });
        }
        let payload = self.read_key_payload(key)?;
        let header = DirHeader::read(&mut RBuffer::new(&payload))?;
        Directory::read_key_list(&self.data, header, self.is_large)
    }

    /// Read a TTree by path (`"tree"` or `"folder/tree"`).
    pub fn get_tree(&self, path: &str) -> Result<Tree> {
        let (dir_path, name) = path.rsplit_once('/').unwrap_or(("", path));
        let dir = self.directory(dir_path)?;
        self.tree_in(&dir, name)
    }

    /// Read a TTree by name from an already-opened directory.
    pub fn tree_in(&self, dir: &Directory, name: &str) -> Result<Tree> {
        let key = dir.find_key(name).ok_or_else(|| RootError::TreeNotFound(name.to_string()))?;
        self.read_tree(key)
    }

    /// Read the TTree a key points to.
    pub fn read_tree(&self, key: &Key) -> Result<Tree> {
        if key.class_name != "TTree" {
            return Err(RootError::TreeNotFound(format!(
                "'{}' is {} not TTree",
                key.name, key.class_name
            )));
        }
        let payload = self.read_key_payload(key)?;
        objects::read_ttree(&payload, key.key_len as usize)
    }

    /// Read a column (`branch` or `branch.leaf`) of a tree.
    pub fn read_column(&self, tree: &Tree, name: &str) -> Result<Column> {
        column::read_column(&self.data, self.is_large, tree, name)
    }

    /// Read a column converted to `f64`.
    pub fn read_column_f64(&self, tree: &Tree, name: &str) -> Result<Vec<f64>> {
        Ok(self.read_column(tree, name)?.to_f64())
    }

    /// Read an integer column.
    pub fn read_column_i64(&self, tree: &Tree, name: &str) -> Result<Vec<i64>> {
        self.read_column(tree, name)?.to_i64()
    }

    /// Read and (if needed) decompress the object behind a key.
    pub fn read_key_payload(&self, key: &Key) -> Result<Vec<u8>> {
        let start = key.seek_key as usize + key.key_len as usize;
        let end = key.seek_key as usize + key.n_bytes as usize;
        let stored = self.data.get(start..end).ok_or(RootError::BufferUnderflow {
            offset: start,
            need: key.payload_len(),
            have: self.data.len().saturating_sub(start),
        })?;
        if key.is_compressed() {
            decompress(stored, key.obj_len as usize)
        } else {
            Ok(stored.to_vec())
        }
    }
}

/// Parse the file header and the top directory streamer.
///
/// Small-file header layout:
/// ```text
/// offset  size  field
///    0      4   magic "root"
///    4      4   fVersion
///    8      4   fBEGIN
///   12      4   fEND          (8 bytes in large files)
///   16      4   fSeekFree     (8 bytes in large files)
///   20      4   fNbytesFree
///   24      4   nfree
///   28      4   fNbytesName
/// ```
/// The top TDirectory streamer sits at `fBEGIN + fNbytesName`.
fn parse_header(data: &[u8]) -> Result<(bool, DirHeader)> {
    let mut r = RBuffer::at(data, 4);
    let version = r.read_u32()?;
    let is_large = version >= LARGE_FILE_VERSION;
    let begin = r.read_u32()? as usize;
    r.skip(if is_large { 16 } else { 8 })?; // fEND, fSeekFree
    let _nbytes_free = r.read_u32()?;
    let _nfree = r.read_u32()?;
    let nbytes_name = r.read_u32()? as usize;

    let dir_pos = begin + nbytes_name;
    if dir_pos >= data.len() {
        return Err(RootError::Deserialization("TDirectory offset past end of file".into()));
    }
    let top = DirHeader::read(&mut RBuffer::at(data, dir_pos))?;
    Ok((is_large, top))
}
