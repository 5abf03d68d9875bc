//! TTree, TBranch and TLeaf streamers.

use std::collections::HashMap;

use crate::error::{Result, RootError};
use crate::rbuffer::{K_BYTE_COUNT_MASK, RBuffer};
use crate::tree::{BranchInfo, LeafInfo, LeafType, Tree};

const K_NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;
const K_CLASS_MASK: u32 = 0x8000_0000;
/// ROOT offsets map entries by two so that 0 and 1 stay free for null/self.
const K_MAP_OFFSET: usize = 2;

/// Class names seen so far in one object payload, keyed the way ROOT's
/// object map keys them: buffer displacement of the class tag + `kMapOffset`.
///
/// Displacements count from the start of the TKey, so the key length is added
/// to positions inside the decompressed payload.
struct ClassMap {
    origin: usize,
    classes: HashMap<usize, String>,
}

/// An element of a streamed `TObjArray`.
struct Element {
    class_name: Option<String>,
    end: usize,
}

impl ClassMap {
    fn new(key_len: usize) -> Self {
        Self { origin: key_len, classes: HashMap::new() }
    }

    /// Read one `ReadObjectAny` header. `None` means a null pointer.
    fn read_element(&mut self, r: &mut RBuffer) -> Result<Option<Element>> {
        let start = r.pos();
        let bcnt = r.read_u32()?;
        if bcnt == 0 {
            return Ok(None);
        }
        if bcnt & K_BYTE_COUNT_MASK == 0 || bcnt == K_NEW_CLASS_TAG {
            return Err(RootError::Deserialization(format!(
                "object at {start} has no byte count (tag {bcnt:#010x})"
            )));
        }
        let end = start + 4 + (bcnt & !K_BYTE_COUNT_MASK) as usize;

        let tag_pos = r.pos();
        let tag = r.read_u32()?;
        let class_name = if tag == K_NEW_CLASS_TAG {
            let name = r.read_cstring()?;
            self.classes.insert(tag_pos + self.origin + K_MAP_OFFSET, name.clone());
            Some(name)
        } else if tag & K_CLASS_MASK != 0 {
            let reference = (tag & !K_CLASS_MASK) as usize;
            let found = self.classes.get(&reference).cloned();
            if found.is_none() {
                tracing::debug!(reference, known = self.classes.len(), "unresolved class reference");
            }
            found
        } else {
            return Err(RootError::Deserialization(format!(
                "object reference {tag:#010x} where an object was expected (pos {tag_pos})"
            )));
        };
        Ok(Some(Element { class_name, end }))
    }
}

/// Read a TTree from its decompressed key payload.
pub fn read_ttree(payload: &[u8], key_len: usize) -> Result<Tree> {
    let mut r = RBuffer::new(payload);
    let mut classes = ClassMap::new(key_len);

    let (tree_ver, tree_end) = r.read_version()?;
    let tree_end =
        tree_end.ok_or_else(|| RootError::Deserialization("TTree missing byte count".into()))?;

    let (name, title) = r.read_tnamed()?;
    r.skip_versioned("TAttLine")?;
    r.skip_versioned("TAttFill")?;
    r.skip_versioned("TAttMarker")?;

    let entries = r.read_i64()?.max(0) as u64; // fEntries
    let _tot_bytes = r.read_i64()?;
    let _zip_bytes = r.read_i64()?;
    let _saved_bytes = r.read_i64()?;
    if tree_ver >= 18 {
        let _flushed_bytes = r.read_i64()?;
    }
    let _weight = r.read_f64()?;
    let _timer_interval = r.read_i32()?;
    let _scan_field = r.read_i32()?;
    let _update = r.read_i32()?;
    if tree_ver >= 18 {
        let _default_entry_offset_len = r.read_i32()?;
    }
    let n_cluster_range = if tree_ver >= 19 { r.read_i32()?.max(0) as usize } else { 0 };
    let _max_entries = r.read_i64()?;
    let _max_entry_loop = r.read_i64()?;
    let _max_virtual_size = r.read_i64()?;
    let _auto_save = r.read_i64()?;
    if tree_ver >= 18 {
        let _auto_flush = r.read_i64()?;
    }
    let _estimate = r.read_i64()?;

    if tree_ver >= 19 {
        // fClusterRangeEnd, fClusterSize: each a 1-byte array marker + n i64.
        for _ in 0..2 {
            let _marker = r.read_u8()?;
            r.skip(8 * n_cluster_range)?;
        }
    }
    if tree_ver >= 20 {
        r.skip_versioned("TIOFeatures")?;
    }

    let branches = read_branch_array(&mut r, &mut classes)?;
    tracing::debug!(tree = %name, version = tree_ver, entries, n_branches = branches.len(), "parsed TTree");

    // fLeaves, fAliases, fIndex, ... are not needed.
    r.set_pos(tree_end);
    Ok(Tree { name, title, entries, branches })
}

/// Read the header of a `TObjArray`; returns `(count, end)`.
fn read_objarray_header(r: &mut RBuffer, what: &str) -> Result<(usize, usize)> {
    let (_ver, end) = r.read_version()?;
    let end = end.ok_or_else(|| RootError::Deserialization(format!("{what} missing byte count")))?;
    r.read_tobject()?;
    let _name = r.read_string()?;
    let count = r.read_i32()?.max(0) as usize;
    let _low_bound = r.read_i32()?;
    Ok((count, end))
}

fn read_branch_array(r: &mut RBuffer, classes: &mut ClassMap) -> Result<Vec<BranchInfo>> {
    let (count, end) = read_objarray_header(r, "fBranches")?;
    // Each element takes at least a 4-byte tag.
    let mut branches = Vec::with_capacity(count.min(r.remaining() / 4));

    for _ in 0..count {
        let Some(el) = classes.read_element(r)? else { continue };
        let class_name = el.class_name.as_deref().unwrap_or("?");
        if class_name != "TBranch" {
            tracing::debug!(class_name, "branch class other than TBranch; reading base part");
        }
        match read_tbranch(r, classes) {
            Ok(b) => branches.push(b),
            Err(e) => tracing::debug!(class_name, error = %e, "skipping unreadable branch"),
        }
        r.set_pos(el.end);
    }

    r.set_pos(end);
    Ok(branches)
}

fn read_tbranch(r: &mut RBuffer, classes: &mut ClassMap) -> Result<BranchInfo> {
    let (branch_ver, branch_end) = r.read_version()?;
    if branch_end.is_none() {
        return Err(RootError::Deserialization("TBranch missing byte count".into()));
    }

    let (name, title) = r.read_tnamed()?;
    r.skip_versioned("TAttFill")?;

    let _compress = r.read_i32()?;
    let _basket_size = r.read_i32()?;
    let entry_offset_len = r.read_i32()?.max(0) as u32;
    let write_basket = r.read_i32()?.max(0) as usize;
    let _entry_number = r.read_i64()?;
    if branch_ver >= 13 {
        r.skip_versioned("TIOFeatures")?;
    }
    let _offset = r.read_i32()?;
    let max_baskets = r.read_i32()?.max(0) as usize;
    let _split_level = r.read_i32()?;
    let entries = r.read_i64()?.max(0) as u64;
    if branch_ver >= 11 {
        let _first_entry = r.read_i64()?;
    }
    let _tot_bytes = r.read_i64()?;
    let _zip_bytes = r.read_i64()?;

    // Sub-branches are not exposed as columns.
    r.skip_versioned("fBranches")?;
    let leaves = read_leaf_array(r, classes)?;
    r.skip_versioned("fBaskets")?;

    if write_basket > max_baskets {
        return Err(RootError::Deserialization(format!(
            "branch '{name}': fWriteBasket {write_basket} > fMaxBaskets {max_baskets}"
        )));
    }

    let _marker = r.read_u8()?;
    let basket_bytes = read_prefix(r, max_baskets, write_basket, |r| Ok(r.read_i32()? as u32))?;
    let _marker = r.read_u8()?;
    let basket_entry = read_prefix(r, max_baskets, write_basket, |r| Ok(r.read_i64()? as u64))?;
    let _marker = r.read_u8()?;
    let basket_seek = read_prefix(r, max_baskets, write_basket, |r| Ok(r.read_i64()? as u64))?;

    Ok(BranchInfo { name, title, leaves, entries, entry_offset_len, basket_bytes, basket_entry, basket_seek })
}

/// Read an array of `total` values, keeping the first `keep`.
fn read_prefix<T>(
    r: &mut RBuffer,
    total: usize,
    keep: usize,
    mut read: impl FnMut(&mut RBuffer) -> Result<T>,
) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(keep.min(total).min(r.remaining() / 4));
    for i in 0..total {
        let v = read(r)?;
        if i < keep {
            out.push(v);
        }
    }
    Ok(out)
}

fn read_leaf_array(r: &mut RBuffer, classes: &mut ClassMap) -> Result<Vec<LeafInfo>> {
    let (count, end) = read_objarray_header(r, "fLeaves")?;
    let mut leaves = Vec::with_capacity(count.min(r.remaining() / 4));

    for _ in 0..count {
        let Some(el) = classes.read_element(r)? else { continue };
        let class_name = el.class_name.unwrap_or_default();
        leaves.push(read_tleaf(r, class_name)?);
        r.set_pos(el.end);
    }

    r.set_pos(end);
    Ok(leaves)
}

/// Read the `TLeaf` base of a concrete leaf class (TLeafF, TLeafI, ...).
fn read_tleaf(r: &mut RBuffer, class_name: String) -> Result<LeafInfo> {
    let _concrete = r.read_version()?;
    let _tleaf = r.read_version()?;
    let (name, _title) = r.read_tnamed()?;
    let len = r.read_i32()?.max(0) as usize;
    let _len_type = r.read_i32()?;
    let _offset = r.read_i32()?;
    let _is_range = r.read_bool()?;
    let unsigned = r.read_bool()?;
    let counted = r.read_u32()? != 0; // fLeafCount pointer

    Ok(LeafInfo {
        name,
        leaf_type: LeafType::from_class(&class_name, unsigned),
        class_name,
        len,
        counted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_counts_fail_without_allocating() {
        let data = 7i32.to_be_bytes();
        let mut r = RBuffer::new(&data);
        let huge = usize::MAX / 2;
        assert!(matches!(
            read_prefix(&mut r, huge, huge, |r| r.read_i32()),
            Err(RootError::BufferUnderflow { .. })
        ));
    }

    #[test]
    fn prefix_keeps_written_slots() {
        let data: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_be_bytes()).collect();
        let mut r = RBuffer::new(&data);
        assert_eq!(read_prefix(&mut r, 3, 2, |r| r.read_i32()).unwrap(), vec![1, 2]);
        assert_eq!(r.remaining(), 0);
    }
}
