//! Minimal ROOT writer used to build test fixtures in memory.
//!
//! It writes small-format files (32-bit seeks) containing directories,
//! TTrees with leaf-list branches split over several baskets, and opaque
//! objects of arbitrary class. Baskets and TTree records can be zlib
//! compressed. The output is meant for this crate's reader and for CLI tests,
//! not for consumption by ROOT itself.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::decompress::root_block;
use crate::rbuffer::K_BYTE_COUNT_MASK;
use crate::tree::LeafType;

const BEGIN: usize = 100;
const FILE_VERSION: u32 = 62206;
const KEY_VERSION: u16 = 4;
const DIR_VERSION: u16 = 5;
const K_NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;
const K_CLASS_MASK: u32 = 0x8000_0000;
const K_MAP_OFFSET: usize = 2;
/// fVersion .. flag of a TBasket key header.
const BASKET_EXTRA_LEN: usize = 19;
/// TDirectory streamer body: fields, UUID and small-file padding.
const DIR_RECORD_LEN: usize = 2 + 4 * 7 + 18 + 12;

/// Compression applied to baskets and TTree records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixtureCompression {
    /// Store everything raw.
    #[default]
    None,
    /// ROOT "ZL" blocks.
    Zlib,
}

#[derive(Debug, Clone)]
struct FixtureLeaf {
    name: String,
    leaf_type: LeafType,
    /// `fLen`.
    len: usize,
    /// Length taken from the preceding leaf (`fLeafCount`).
    counted: bool,
}

impl FixtureLeaf {
    fn scalar(name: &str, leaf_type: LeafType) -> Self {
        Self { name: name.to_string(), leaf_type, len: 1, counted: false }
    }

    fn title(&self, count_name: &str) -> String {
        let code = self.leaf_type.type_code();
        match (self.counted, self.len) {
            (true, _) => format!("{}[{count_name}]/{code}", self.name),
            (false, 1) => format!("{}/{code}", self.name),
            (false, n) => format!("{}[{n}]/{code}", self.name),
        }
    }
}

/// A leaf-list branch. Each row holds the values of its leaves in order:
/// one per scalar leaf, `len` for an array leaf, and all remaining values
/// for a counted leaf.
#[derive(Debug, Clone)]
pub struct FixtureBranch {
    name: String,
    leaves: Vec<FixtureLeaf>,
    rows: Vec<Vec<f64>>,
}

/// A TTree to write.
#[derive(Debug, Clone)]
pub struct FixtureTree {
    name: String,
    title: String,
    cycle: u16,
    basket_entries: usize,
    entry_offsets: bool,
    nev_buf_skew: i32,
    branches: Vec<FixtureBranch>,
}

impl FixtureTree {
    /// Empty tree.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: String::new(),
            cycle: 1,
            basket_entries: 64,
            entry_offsets: false,
            nev_buf_skew: 0,
            branches: Vec::new(),
        }
    }

    /// Set the tree title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the key cycle.
    pub fn cycle(mut self, cycle: u16) -> Self {
        self.cycle = cycle;
        self
    }

    /// Entries per basket (at least 1).
    pub fn basket_entries(mut self, n: usize) -> Self {
        self.basket_entries = n.max(1);
        self
    }

    /// Follow each basket's entry data with an entry-offset table that lies
    /// past `fLast`.
    pub fn entry_offsets(mut self) -> Self {
        self.entry_offsets = true;
        self
    }

    /// Add `delta` to the `fNevBuf` written in every basket, so that the
    /// entry data no longer matches the entry count.
    pub fn nev_buf_skew(mut self, delta: i32) -> Self {
        self.nev_buf_skew = delta;
        self
    }

    /// Add a branch. Each row must have one value per leaf; values are
    /// narrowed to the leaf type when written.
    pub fn branch(mut self, name: &str, leaves: &[(&str, LeafType)], rows: Vec<Vec<f64>>) -> Self {
        self.branches.push(FixtureBranch {
            name: name.to_string(),
            leaves: leaves.iter().map(|(n, t)| FixtureLeaf::scalar(n, *t)).collect(),
            rows,
        });
        self
    }

    /// Add a branch with one fixed-size array leaf (`name[len]`).
    pub fn array(mut self, name: &str, leaf_type: LeafType, len: usize, rows: Vec<Vec<f64>>) -> Self {
        let leaf = FixtureLeaf { len: len.max(1), ..FixtureLeaf::scalar(name, leaf_type) };
        self.branches.push(FixtureBranch { name: name.to_string(), leaves: vec![leaf], rows });
        self
    }

    /// Add a branch holding a counter leaf `count` (`I32`) followed by the
    /// variable-length leaf `name[count]`.
    pub fn counted(mut self, name: &str, count: &str, leaf_type: LeafType, values: &[Vec<f64>]) -> Self {
        let leaves = vec![
            FixtureLeaf::scalar(count, LeafType::I32),
            FixtureLeaf { counted: true, ..FixtureLeaf::scalar(name, leaf_type) },
        ];
        let rows = values
            .iter()
            .map(|v| std::iter::once(v.len() as f64).chain(v.iter().copied()).collect())
            .collect();
        self.branches.push(FixtureBranch { name: name.to_string(), leaves, rows });
        self
    }

    /// Add a single-leaf branch whose leaf has the branch's name.
    pub fn scalar(self, name: &str, leaf_type: LeafType, values: &[f64]) -> Self {
        let rows = values.iter().map(|&v| vec![v]).collect();
        self.branch(name, &[(name, leaf_type)], rows)
    }

    fn entries(&self) -> usize {
        self.branches.iter().map(|b| b.rows.len()).max().unwrap_or(0)
    }
}

/// Something stored under a key.
#[derive(Debug, Clone)]
pub enum FixtureObject {
    /// A TTree.
    Tree(FixtureTree),
    /// An object of any class with a few placeholder bytes as payload.
    Opaque {
        /// Class name in the key.
        class_name: String,
        /// Key name.
        name: String,
    },
}

/// A subdirectory (`TDirectoryFile`).
#[derive(Debug, Clone)]
pub struct FixtureDir {
    name: String,
    objects: Vec<FixtureObject>,
}

impl FixtureDir {
    /// Empty directory.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), objects: Vec::new() }
    }

    /// Add a tree.
    pub fn tree(mut self, tree: FixtureTree) -> Self {
        self.objects.push(FixtureObject::Tree(tree));
        self
    }

    /// Add an opaque object.
    pub fn object(mut self, class_name: &str, name: &str) -> Self {
        self.objects.push(FixtureObject::Opaque { class_name: class_name.into(), name: name.into() });
        self
    }
}

#[derive(Debug, Clone)]
enum TopEntry {
    Object(FixtureObject),
    Dir(FixtureDir),
}

/// A whole file.
#[derive(Debug, Clone)]
pub struct FixtureFile {
    file_name: String,
    compression: FixtureCompression,
    top: Vec<TopEntry>,
}

impl Default for FixtureFile {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureFile {
    /// Empty file.
    pub fn new() -> Self {
        Self { file_name: "fixture.root".into(), compression: FixtureCompression::None, top: Vec::new() }
    }

    /// Choose the compression.
    pub fn compression(mut self, c: FixtureCompression) -> Self {
        self.compression = c;
        self
    }

    /// Add a top-level directory.
    pub fn directory(mut self, dir: FixtureDir) -> Self {
        self.top.push(TopEntry::Dir(dir));
        self
    }

    /// Add a top-level tree.
    pub fn tree(mut self, tree: FixtureTree) -> Self {
        self.top.push(TopEntry::Object(FixtureObject::Tree(tree)));
        self
    }

    /// Add a top-level opaque object.
    pub fn object(mut self, class_name: &str, name: &str) -> Self {
        self.top.push(TopEntry::Object(FixtureObject::Opaque {
            class_name: class_name.into(),
            name: name.into(),
        }));
        self
    }

    /// Write the file to disk.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_bytes())
    }

    /// Serialize the file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut f = FileWriter { out: vec![0u8; BEGIN], compression: self.compression };

        // TFile record: key header, TNamed strings, top directory streamer.
        let top_keylen = key_len("TFile", &self.file_name, "", 0);
        let nbytes_name = top_keylen + tstring_len(&self.file_name) + tstring_len("");
        let top_nbytes = nbytes_name + DIR_RECORD_LEN;
        f.out.extend(key_header(&KeySpec {
            nbytes: top_nbytes,
            objlen: top_nbytes - top_keylen,
            keylen: top_keylen,
            cycle: 1,
            seek: BEGIN,
            pdir: 0,
            class_name: "TFile",
            name: &self.file_name,
            title: "",
        }));
        let mut w = WBuf::default();
        w.string(&self.file_name);
        w.string("");
        f.out.extend(w.buf);
        let top_dir_pos = f.out.len();
        f.out.extend(dir_record(0, nbytes_name, BEGIN, 0, 0));

        let mut top_keys = Vec::new();
        for entry in &self.top {
            match entry {
                TopEntry::Object(obj) => top_keys.push(f.object(obj, BEGIN)),
                TopEntry::Dir(dir) => top_keys.push(f.directory(dir)),
            }
        }
        let (seek_keys, nbytes_keys) = f.key_list("TFile", &self.file_name, &top_keys);

        // Patch the top directory with its key list.
        put_u32(&mut f.out, top_dir_pos + 10, nbytes_keys as u32);
        put_u32(&mut f.out, top_dir_pos + 26, seek_keys as u32);

        let end = f.out.len();
        let mut h = WBuf::default();
        h.bytes(b"root");
        h.u32(FILE_VERSION);
        h.u32(BEGIN as u32);
        h.u32(end as u32); // fEND
        h.u32(0); // fSeekFree
        h.u32(0); // fNbytesFree
        h.u32(0); // nfree
        h.u32(nbytes_name as u32);
        h.u8(4); // fUnits
        h.i32(if self.compression == FixtureCompression::Zlib { 101 } else { 0 });
        h.u32(0); // fSeekInfo
        h.u32(0); // fNbytesInfo
        h.u16(4); // UUID version
        h.bytes(&[0u8; 16]);
        f.out[..h.buf.len()].copy_from_slice(&h.buf);
        f.out
    }
}

struct KeySpec<'a> {
    nbytes: usize,
    objlen: usize,
    keylen: usize,
    cycle: u16,
    seek: usize,
    pdir: usize,
    class_name: &'a str,
    name: &'a str,
    title: &'a str,
}

fn key_header(k: &KeySpec) -> Vec<u8> {
    let mut w = WBuf::default();
    w.u32(k.nbytes as u32);
    w.u16(KEY_VERSION);
    w.u32(k.objlen as u32);
    w.u32(0); // datime
    w.u16(k.keylen as u16);
    w.u16(k.cycle);
    w.u32(k.seek as u32);
    w.u32(k.pdir as u32);
    w.string(k.class_name);
    w.string(k.name);
    w.string(k.title);
    w.buf
}

fn key_len(class_name: &str, name: &str, title: &str, extra: usize) -> usize {
    26 + tstring_len(class_name) + tstring_len(name) + tstring_len(title) + extra
}

fn tstring_len(s: &str) -> usize {
    if s.len() < 255 { 1 + s.len() } else { 5 + s.len() }
}

fn dir_record(nbytes_keys: usize, nbytes_name: usize, seek_dir: usize, seek_parent: usize, seek_keys: usize) -> Vec<u8> {
    let mut w = WBuf::default();
    w.u16(DIR_VERSION);
    w.u32(0); // fDatimeC
    w.u32(0); // fDatimeM
    w.u32(nbytes_keys as u32);
    w.u32(nbytes_name as u32);
    w.u32(seek_dir as u32);
    w.u32(seek_parent as u32);
    w.u32(seek_keys as u32);
    w.u16(4); // UUID version
    w.bytes(&[0u8; 16]);
    w.bytes(&[0u8; 12]);
    w.buf
}

fn put_u32(out: &mut [u8], pos: usize, v: u32) {
    out[pos..pos + 4].copy_from_slice(&v.to_be_bytes());
}

/// Appends records to the growing file image.
struct FileWriter {
    out: Vec<u8>,
    compression: FixtureCompression,
}

impl FileWriter {
    fn compress(&self, raw: &[u8]) -> Vec<u8> {
        if self.compression == FixtureCompression::None || raw.is_empty() {
            return raw.to_vec();
        }
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        // Writing into a Vec cannot fail.
        let compressed = enc.write_all(raw).and_then(|_| enc.finish()).unwrap_or_default();
        let block = root_block(b"ZL", 8, &compressed, raw.len());
        // Equal sizes would read back as "not compressed".
        if compressed.is_empty() || block.len() == raw.len() { raw.to_vec() } else { block }
    }

    /// Append a keyed record; returns the key header (for the key list).
    fn record(&mut self, spec: RecordSpec, raw: &[u8]) -> Vec<u8> {
        let keylen = key_len(spec.class_name, spec.name, spec.title, spec.extra.len());
        let stored = self.compress(raw);
        let seek = self.out.len();
        let header = key_header(&KeySpec {
            nbytes: keylen + stored.len(),
            objlen: raw.len(),
            keylen,
            cycle: spec.cycle,
            seek,
            pdir: spec.pdir,
            class_name: spec.class_name,
            name: spec.name,
            title: spec.title,
        });
        self.out.extend(&header);
        self.out.extend(spec.extra);
        self.out.extend(stored);
        header
    }

    fn object(&mut self, obj: &FixtureObject, pdir: usize) -> Vec<u8> {
        match obj {
            FixtureObject::Tree(t) => self.tree(t, pdir),
            FixtureObject::Opaque { class_name, name } => {
                let spec = RecordSpec { class_name, name, title: "", cycle: 1, pdir, extra: &[] };
                self.record(spec, &[0u8; 8])
            }
        }
    }

    fn directory(&mut self, dir: &FixtureDir) -> Vec<u8> {
        let keys: Vec<Vec<u8>> = dir.objects.iter().map(|o| self.object(o, BEGIN)).collect();
        let (seek_keys, nbytes_keys) = self.key_list("TDirectoryFile", &dir.name, &keys);
        let seek_dir = self.out.len();
        let body = dir_record(nbytes_keys, 0, seek_dir, BEGIN, seek_keys);
        let header = key_header(&KeySpec {
            nbytes: key_len("TDirectoryFile", &dir.name, "", 0) + body.len(),
            objlen: body.len(),
            keylen: key_len("TDirectoryFile", &dir.name, "", 0),
            cycle: 1,
            seek: seek_dir,
            pdir: BEGIN,
            class_name: "TDirectoryFile",
            name: &dir.name,
            title: "",
        });
        self.out.extend(&header);
        self.out.extend(body);
        header
    }

    /// Append a key list; returns `(seek, nbytes)`.
    fn key_list(&mut self, class_name: &str, name: &str, keys: &[Vec<u8>]) -> (usize, usize) {
        let keylen = key_len(class_name, name, "", 0);
        let body_len = 4 + keys.iter().map(Vec::len).sum::<usize>();
        let seek = self.out.len();
        self.out.extend(key_header(&KeySpec {
            nbytes: keylen + body_len,
            objlen: body_len,
            keylen,
            cycle: 1,
            seek,
            pdir: BEGIN,
            class_name,
            name,
            title: "",
        }));
        self.out.extend((keys.len() as i32).to_be_bytes());
        for k in keys {
            self.out.extend(k);
        }
        (seek, keylen + body_len)
    }

    fn tree(&mut self, tree: &FixtureTree, pdir: usize) -> Vec<u8> {
        let baskets: Vec<BasketLayout> =
            tree.branches.iter().map(|b| self.baskets(tree, b)).collect();

        let keylen = key_len("TTree", &tree.name, &tree.title, 0);
        let mut w = ObjWriter::new(keylen);
        write_ttree(&mut w, tree, &baskets, self.compression);
        let spec = RecordSpec {
            class_name: "TTree",
            name: &tree.name,
            title: &tree.title,
            cycle: tree.cycle,
            pdir,
            extra: &[],
        };
        self.record(spec, &w.w.buf)
    }

    fn baskets(&mut self, tree: &FixtureTree, branch: &FixtureBranch) -> BasketLayout {
        let entry_size: usize =
            branch.leaves.iter().filter(|l| !l.counted).map(|l| l.leaf_type.byte_size() * l.len).sum();
        let mut layout = BasketLayout::default();
        let mut first = 0usize;
        for chunk in branch.rows.chunks(tree.basket_entries) {
            let keylen = key_len("TBasket", &branch.name, &tree.name, BASKET_EXTRA_LEN);
            let mut data = WBuf::default();
            let mut starts = Vec::with_capacity(chunk.len());
            for row in chunk {
                starts.push((keylen + data.buf.len()) as i32);
                let mut values = row.iter().copied();
                for leaf in &branch.leaves {
                    let n = if leaf.counted { row.len().saturating_sub(1) } else { leaf.len };
                    for _ in 0..n {
                        data.value(leaf.leaf_type, values.next().unwrap_or(0.0));
                    }
                }
            }
            let last = keylen + data.buf.len();
            if tree.entry_offsets {
                data.i32(starts.len() as i32 + 1);
                for start in &starts {
                    data.i32(*start);
                }
                data.i32(0);
            }
            let mut extra = WBuf::default();
            extra.u16(3); // fVersion
            extra.i32(32000); // fBufferSize
            extra.i32(entry_size as i32); // fNevBufSize
            extra.i32(chunk.len() as i32 + tree.nev_buf_skew); // fNevBuf
            extra.i32(last as i32); // fLast
            extra.u8(0); // flag

            let seek = self.out.len();
            let spec = RecordSpec {
                class_name: "TBasket",
                name: &branch.name,
                title: &tree.name,
                cycle: 1,
                pdir: BEGIN,
                extra: &extra.buf,
            };
            self.record(spec, &data.buf);
            layout.bytes.push((self.out.len() - seek) as u32);
            layout.entry.push(first as u64);
            layout.seek.push(seek as u64);
            layout.tot_bytes += (keylen + data.buf.len()) as i64;
            layout.zip_bytes += (self.out.len() - seek) as i64;
            first += chunk.len();
        }
        layout.entries = branch.rows.len() as u64;
        layout
    }
}

struct RecordSpec<'a> {
    class_name: &'a str,
    name: &'a str,
    title: &'a str,
    cycle: u16,
    pdir: usize,
    extra: &'a [u8],
}

#[derive(Default)]
struct BasketLayout {
    bytes: Vec<u32>,
    entry: Vec<u64>,
    seek: Vec<u64>,
    entries: u64,
    tot_bytes: i64,
    zip_bytes: i64,
}

fn write_ttree(w: &mut ObjWriter, tree: &FixtureTree, baskets: &[BasketLayout], c: FixtureCompression) {
    let entries = tree.entries() as i64;
    let tot: i64 = baskets.iter().map(|b| b.tot_bytes).sum();
    let zip: i64 = baskets.iter().map(|b| b.zip_bytes).sum();
    w.versioned(20, |w| {
        w.tnamed(&tree.name, &tree.title);
        w.versioned(2, |w| {
            w.w.i16(1); // fLineColor
            w.w.i16(1); // fLineStyle
            w.w.i16(1); // fLineWidth
        });
        w.versioned(2, |w| {
            w.w.i16(0); // fFillColor
            w.w.i16(1001); // fFillStyle
        });
        w.versioned(2, |w| {
            w.w.i16(1); // fMarkerColor
            w.w.i16(1); // fMarkerStyle
            w.w.f32(1.0); // fMarkerSize
        });
        w.w.i64(entries);
        w.w.i64(tot); // fTotBytes
        w.w.i64(zip); // fZipBytes
        w.w.i64(0); // fSavedBytes
        w.w.i64(0); // fFlushedBytes
        w.w.f64(1.0); // fWeight
        w.w.i32(0); // fTimerInterval
        w.w.i32(25); // fScanField
        w.w.i32(0); // fUpdate
        w.w.i32(1000); // fDefaultEntryOffsetLen
        w.w.i32(0); // fNClusterRange
        w.w.i64(1_000_000_000_000); // fMaxEntries
        w.w.i64(1_000_000_000_000); // fMaxEntryLoop
        w.w.i64(0); // fMaxVirtualSize
        w.w.i64(-300_000_000); // fAutoSave
        w.w.i64(-30_000_000); // fAutoFlush
        w.w.i64(1_000_000); // fEstimate
        w.w.u8(0); // fClusterRangeEnd marker
        w.w.u8(0); // fClusterSize marker
        w.versioned(1, |w| w.w.u8(0)); // TIOFeatures
        w.objarray(tree.branches.len(), |w| {
            for (b, layout) in tree.branches.iter().zip(baskets) {
                w.object("TBranch", |w| write_tbranch(w, b, layout, tree.entry_offsets, c));
            }
        });
    });
}

fn write_tbranch(
    w: &mut ObjWriter,
    b: &FixtureBranch,
    layout: &BasketLayout,
    entry_offsets: bool,
    c: FixtureCompression,
) {
    let mut count_name = "";
    let mut titles = Vec::with_capacity(b.leaves.len());
    for leaf in &b.leaves {
        titles.push(leaf.title(count_name));
        count_name = leaf.name.as_str();
    }
    let leaf_list = titles.join(":");
    let n_baskets = layout.seek.len();
    let max_baskets = n_baskets + 1;

    w.versioned(13, |w| {
        w.tnamed(&b.name, &leaf_list);
        w.versioned(2, |w| {
            w.w.i16(0);
            w.w.i16(1001);
        });
        w.w.i32(if c == FixtureCompression::Zlib { 101 } else { 0 }); // fCompress
        w.w.i32(32000); // fBasketSize
        w.w.i32(if entry_offsets { 1000 } else { 0 }); // fEntryOffsetLen
        w.w.i32(n_baskets as i32); // fWriteBasket
        w.w.i64(layout.entries as i64); // fEntryNumber
        w.versioned(1, |w| w.w.u8(0)); // TIOFeatures
        w.w.i32(0); // fOffset
        w.w.i32(max_baskets as i32);
        w.w.i32(0); // fSplitLevel
        w.w.i64(layout.entries as i64);
        w.w.i64(0); // fFirstEntry
        w.w.i64(layout.tot_bytes);
        w.w.i64(layout.zip_bytes);
        w.objarray(0, |_| {}); // fBranches
        w.objarray(b.leaves.len(), |w| {
            let mut offset = 0;
            let mut previous = 0;
            for (leaf, title) in b.leaves.iter().zip(&titles) {
                let count_ref = if leaf.counted { previous } else { 0 };
                previous = w.object(leaf.leaf_type.class_name(), |w| write_tleaf(w, leaf, title, offset, count_ref));
                offset += leaf.leaf_type.byte_size() * leaf.len;
            }
        });
        w.objarray(0, |_| {}); // fBaskets

        w.w.u8(1);
        for i in 0..max_baskets {
            w.w.i32(layout.bytes.get(i).copied().unwrap_or(0) as i32);
        }
        w.w.u8(1);
        for i in 0..max_baskets {
            w.w.i64(layout.entry.get(i).copied().unwrap_or(layout.entries) as i64);
        }
        w.w.u8(1);
        for i in 0..max_baskets {
            w.w.i64(layout.seek.get(i).copied().unwrap_or(0) as i64);
        }
        w.w.string(""); // fFileName
    });
}

/// `count_ref` is the object-map offset of the counter leaf, or 0.
fn write_tleaf(w: &mut ObjWriter, leaf: &FixtureLeaf, title: &str, offset: usize, count_ref: usize) {
    let t = leaf.leaf_type;
    w.versioned(1, |w| {
        w.versioned(2, |w| {
            w.tnamed(&leaf.name, title);
            w.w.i32(leaf.len as i32); // fLen
            w.w.i32(t.byte_size() as i32); // fLenType
            w.w.i32(offset as i32); // fOffset
            w.w.u8(0); // fIsRange
            w.w.u8(t.is_unsigned() as u8);
            w.w.u32(count_ref as u32); // fLeafCount
        });
        // fMinimum, fMaximum
        w.w.bytes(&vec![0u8; 2 * t.byte_size()]);
    });
}

/// Streamer writer with ROOT's class-tag bookkeeping.
struct ObjWriter {
    w: WBuf,
    origin: usize,
    classes: HashMap<String, usize>,
}

impl ObjWriter {
    fn new(key_len: usize) -> Self {
        Self { w: WBuf::default(), origin: key_len, classes: HashMap::new() }
    }

    fn versioned(&mut self, version: u16, body: impl FnOnce(&mut Self)) {
        let at = self.w.begin_count();
        self.w.u16(version);
        body(self);
        self.w.end_count(at);
    }

    fn tobject(&mut self) {
        self.w.u16(1);
        self.w.u32(0); // fUniqueID
        self.w.u32(0x0300_0000); // fBits
    }

    fn tnamed(&mut self, name: &str, title: &str) {
        self.versioned(1, |w| {
            w.tobject();
            w.w.string(name);
            w.w.string(title);
        });
    }

    fn objarray(&mut self, count: usize, body: impl FnOnce(&mut Self)) {
        self.versioned(3, |w| {
            w.tobject();
            w.w.string("");
            w.w.i32(count as i32);
            w.w.i32(0); // fLowerBound
            body(w);
        });
    }

    /// Write a tagged object; returns its object-map offset.
    fn object(&mut self, class_name: &str, body: impl FnOnce(&mut Self)) -> usize {
        let at = self.w.begin_count();
        let known = self.classes.get(class_name).copied();
        match known {
            Some(reference) => self.w.u32(reference as u32 | K_CLASS_MASK),
            None => {
                let tag_pos = self.w.buf.len();
                self.w.u32(K_NEW_CLASS_TAG);
                self.w.bytes(class_name.as_bytes());
                self.w.u8(0);
                self.classes.insert(class_name.to_string(), tag_pos + self.origin + K_MAP_OFFSET);
            }
        }
        body(self);
        self.w.end_count(at);
        at + self.origin + K_MAP_OFFSET
    }
}

#[derive(Default)]
struct WBuf {
    buf: Vec<u8>,
}

impl WBuf {
    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }
    fn u16(&mut self, v: u16) {
        self.bytes(&v.to_be_bytes());
    }
    fn i16(&mut self, v: i16) {
        self.bytes(&v.to_be_bytes());
    }
    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_be_bytes());
    }
    fn i32(&mut self, v: i32) {
        self.bytes(&v.to_be_bytes());
    }
    fn i64(&mut self, v: i64) {
        self.bytes(&v.to_be_bytes());
    }
    fn f32(&mut self, v: f32) {
        self.bytes(&v.to_be_bytes());
    }
    fn f64(&mut self, v: f64) {
        self.bytes(&v.to_be_bytes());
    }

    fn string(&mut self, s: &str) {
        if s.len() < 255 {
            self.u8(s.len() as u8);
        } else {
            self.u8(255);
            self.u32(s.len() as u32);
        }
        self.bytes(s.as_bytes());
    }

    fn value(&mut self, t: LeafType, v: f64) {
        match t {
            LeafType::F32 => self.f32(v as f32),
            LeafType::F64 => self.f64(v),
            LeafType::I8 => self.u8(v as i8 as u8),
            LeafType::U8 => self.u8(v as u8),
            LeafType::Bool => self.u8((v != 0.0) as u8),
            LeafType::I16 => self.i16(v as i16),
            LeafType::U16 => self.u16(v as u16),
            LeafType::I32 => self.i32(v as i32),
            LeafType::U32 => self.u32(v as u32),
            LeafType::I64 => self.i64(v as i64),
            LeafType::U64 => self.bytes(&(v as u64).to_be_bytes()),
        }
    }

    fn begin_count(&mut self) -> usize {
        let at = self.buf.len();
        self.u32(0);
        at
    }

    fn end_count(&mut self, at: usize) {
        let count = (self.buf.len() - at - 4) as u32;
        put_u32(&mut self.buf, at, count | K_BYTE_COUNT_MASK);
    }
}
