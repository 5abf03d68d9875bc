//! TTree metadata: branches, leaves and basket locations.

/// Leaf data type (from the TLeaf class and its `fIsUnsigned` flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafType {
    /// `TLeafF`: 32-bit float.
    F32,
    /// `TLeafD`: 64-bit float.
    F64,
    /// `TLeafB`: 8-bit signed integer.
    I8,
    /// `TLeafB`, unsigned.
    U8,
    /// `TLeafS`: 16-bit signed integer.
    I16,
    /// `TLeafS`, unsigned.
    U16,
    /// `TLeafI`: 32-bit signed integer.
    I32,
    /// `TLeafI`, unsigned.
    U32,
    /// `TLeafL`: 64-bit signed integer.
    I64,
    /// `TLeafL`, unsigned.
    U64,
    /// `TLeafO`: boolean stored in one byte.
    Bool,
}

impl LeafType {
    /// Map a TLeaf class name to a leaf type.
    pub fn from_class(class_name: &str, unsigned: bool) -> Option<Self> {
        let t = match (class_name, unsigned) {
            ("TLeafF", _) => LeafType::F32,
            ("TLeafD", _) => LeafType::F64,
            ("TLeafB", false) => LeafType::I8,
            ("TLeafB", true) => LeafType::U8,
            ("TLeafS", false) => LeafType::I16,
            ("TLeafS", true) => LeafType::U16,
            ("TLeafI", false) => LeafType::I32,
            ("TLeafI", true) => LeafType::U32,
            ("TLeafL", false) => LeafType::I64,
            ("TLeafL", true) => LeafType::U64,
            ("TLeafO", _) => LeafType::Bool,
            _ => return None,
        };
        Some(t)
    }

    /// TLeaf class name for this type.
    pub fn class_name(self) -> &'static str {
        match self {
            LeafType::F32 => "TLeafF",
            LeafType::F64 => "TLeafD",
            LeafType::I8 | LeafType::U8 => "TLeafB",
            LeafType::I16 | LeafType::U16 => "TLeafS",
            LeafType::I32 | LeafType::U32 => "TLeafI",
            LeafType::I64 | LeafType::U64 => "TLeafL",
            LeafType::Bool => "TLeafO",
        }
    }

    /// Size in bytes of one element.
    pub fn byte_size(self) -> usize {
        match self {
            LeafType::I8 | LeafType::U8 | LeafType::Bool => 1,
            LeafType::I16 | LeafType::U16 => 2,
            LeafType::F32 | LeafType::I32 | LeafType::U32 => 4,
            LeafType::F64 | LeafType::I64 | LeafType::U64 => 8,
        }
    }

    /// Whether values are floating point.
    pub fn is_float(self) -> bool {
        matches!(self, LeafType::F32 | LeafType::F64)
    }

    /// Whether the type is unsigned.
    pub fn is_unsigned(self) -> bool {
        matches!(self, LeafType::U8 | LeafType::U16 | LeafType::U32 | LeafType::U64)
    }

    /// ROOT leaf-list type code (`x/F`, `run/i`, ...).
    pub fn type_code(self) -> char {
        match self {
            LeafType::F32 => 'F',
            LeafType::F64 => 'D',
            LeafType::I8 => 'B',
            LeafType::U8 => 'b',
            LeafType::I16 => 'S',
            LeafType::U16 => 's',
            LeafType::I32 => 'I',
            LeafType::U32 => 'i',
            LeafType::I64 => 'L',
            LeafType::U64 => 'l',
            LeafType::Bool => 'O',
        }
    }
}

/// One TLeaf of a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafInfo {
    /// Leaf name (`x` in `BPIX.x`).
    pub name: String,
    /// Decoded type, `None` for leaf classes we do not know.
    pub leaf_type: Option<LeafType>,
    /// TLeaf class name as stored.
    pub class_name: String,
    /// Elements per entry (`fLen`); > 1 for fixed arrays.
    pub len: usize,
    /// Whether the leaf length is driven by a counter leaf.
    pub counted: bool,
}

impl LeafInfo {
    /// Bytes this leaf occupies in one entry, if it has a fixed layout.
    pub fn fixed_size(&self) -> Option<usize> {
        if self.counted {
            return None;
        }
        self.leaf_type.map(|t| t.byte_size() * self.len)
    }
}

/// Metadata for one top-level TBranch.
#[derive(Debug, Clone)]
pub struct BranchInfo {
    /// Branch name.
    pub name: String,
    /// Branch title (the leaf list for simple branches, e.g. `x/F:y/F:z/F`).
    pub title: String,
    /// Leaves in storage order.
    pub leaves: Vec<LeafInfo>,
    /// Total number of entries in this branch.
    pub entries: u64,
    /// `fEntryOffsetLen`: non-zero when baskets carry an entry-offset table.
    pub entry_offset_len: u32,
    /// Compressed byte size of each written basket.
    pub basket_bytes: Vec<u32>,
    /// First entry of each written basket.
    pub basket_entry: Vec<u64>,
    /// File position of each written basket.
    pub basket_seek: Vec<u64>,
}

impl BranchInfo {
    /// Number of baskets written to the file.
    pub fn n_baskets(&self) -> usize {
        self.basket_seek.len()
    }

    /// Bytes per entry, if every leaf has a fixed layout.
    pub fn entry_size(&self) -> Option<usize> {
        self.leaves.iter().map(LeafInfo::fixed_size).sum()
    }

    /// Index and byte offset (within one entry) of the named leaf.
    pub fn leaf_offset(&self, leaf: &str) -> Option<(usize, usize)> {
        let mut offset = 0;
        for (i, l) in self.leaves.iter().enumerate() {
            if l.name == leaf {
                return Some((i, offset));
            }
            offset += l.fixed_size()?;
        }
        None
    }

    /// Column names this branch exposes: the branch name itself for a single
    /// leaf of the same name, `branch.leaf` otherwise.
    pub fn column_names(&self) -> Vec<String> {
        match self.leaves.as_slice() {
            [only] if only.name == self.name => vec![self.name.clone()],
            leaves => leaves.iter().map(|l| format!("{}.{}", self.name, l.name)).collect(),
        }
    }
}

/// A parsed TTree.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Tree name.
    pub name: String,
    /// Tree title.
    pub title: String,
    /// Total number of entries.
    pub entries: u64,
    /// Top-level branches in file order.
    pub branches: Vec<BranchInfo>,
}

impl Tree {
    /// Find a branch by name.
    pub fn find_branch(&self, name: &str) -> Option<&BranchInfo> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Top-level branch names in file order.
    pub fn branch_names(&self) -> Vec<&str> {
        self.branches.iter().map(|b| b.name.as_str()).collect()
    }

    /// All column names (see [`BranchInfo::column_names`]).
    pub fn column_names(&self) -> Vec<String> {
        self.branches.iter().flat_map(BranchInfo::column_names).collect()
    }

    /// Resolve a column name to its branch and leaf index.
    ///
    /// An exact branch name wins (and must have a single leaf); otherwise the
    /// name is split at its last `.` into `branch.leaf`.
    pub fn resolve_column(&self, column: &str) -> Option<(&BranchInfo, usize)> {
        if let Some(b) = self.find_branch(column)
            && b.leaves.len() == 1
        {
            return Some((b, 0));
        }
        let (branch, leaf) = column.rsplit_once('.')?;
        let b = self.find_branch(branch)?;
        let idx = b.leaves.iter().position(|l| l.name == leaf)?;
        Some((b, idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, t: LeafType) -> LeafInfo {
        LeafInfo {
            name: name.into(),
            leaf_type: Some(t),
            class_name: t.class_name().into(),
            len: 1,
            counted: false,
        }
    }

    fn branch(name: &str, leaves: Vec<LeafInfo>) -> BranchInfo {
        BranchInfo {
            name: name.into(),
            title: String::new(),
            leaves,
            entries: 0,
            entry_offset_len: 0,
            basket_bytes: vec![],
            basket_entry: vec![],
            basket_seek: vec![],
        }
    }

    fn tree() -> Tree {
        Tree {
            name: "PixelBarycentre".into(),
            title: String::new(),
            entries: 0,
            branches: vec![
                branch("run", vec![leaf("run", LeafType::U32)]),
                branch(
                    "BPIX",
                    vec![leaf("x", LeafType::F32), leaf("y", LeafType::F32), leaf("z", LeafType::F32)],
                ),
            ],
        }
    }

    #[test]
    fn leaf_types_from_class() {
        assert_eq!(LeafType::from_class("TLeafI", true), Some(LeafType::U32));
        assert_eq!(LeafType::from_class("TLeafD", false), Some(LeafType::F64));
        assert_eq!(LeafType::from_class("TLeafElement", false), None);
        assert_eq!(LeafType::U16.class_name(), "TLeafS");
    }

    #[test]
    fn column_names_follow_dataframe_convention() {
        assert_eq!(tree().column_names(), vec!["run", "BPIX.x", "BPIX.y", "BPIX.z"]);
        assert_eq!(tree().branch_names(), vec!["run", "BPIX"]);
    }

    #[test]
    fn leaf_offsets_accumulate() {
        let t = tree();
        let b = t.find_branch("BPIX").unwrap();
        assert_eq!(b.entry_size(), Some(12));
        assert_eq!(b.leaf_offset("z"), Some((2, 8)));
        assert_eq!(b.leaf_offset("w"), None);
    }

    #[test]
    fn resolve_column_prefers_exact_branch() {
        let t = tree();
        let (b, i) = t.resolve_column("BPIX.y").unwrap();
        assert_eq!((b.name.as_str(), i), ("BPIX", 1));
        let (b, i) = t.resolve_column("run").unwrap();
        assert_eq!((b.name.as_str(), i), ("run", 0));
        assert!(t.resolve_column("BPIX").is_none());
        assert!(t.resolve_column("FPIX.x").is_none());
    }

    #[test]
    fn counted_leaves_have_no_fixed_size() {
        let mut b = branch("hits", vec![leaf("n", LeafType::I32)]);
        b.leaves.push(LeafInfo { counted: true, ..leaf("x", LeafType::F32) });
        assert_eq!(b.entry_size(), None);
    }
}
