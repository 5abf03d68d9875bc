//! Column extraction from fixed-layout branches.

use crate::basket::read_basket;
use crate::error::{Result, RootError};
use crate::tree::{BranchInfo, LeafType, Tree};

/// Values of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    /// Integer and boolean leaves.
    Int(Vec<i64>),
    /// Floating-point leaves.
    Float(Vec<f64>),
}

/// A fully materialized column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name as requested (`run`, `BPIX.x`).
    pub name: String,
    /// Storage type of the leaf.
    pub leaf_type: LeafType,
    /// Decoded values, one per entry.
    pub values: ColumnValues,
}

impl Column {
    /// Number of entries.
    pub fn len(&self) -> usize {
        match &self.values {
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
        }
    }

    /// Whether the column has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values converted to `f64`.
    pub fn to_f64(&self) -> Vec<f64> {
        match &self.values {
            ColumnValues::Int(v) => v.iter().map(|&x| x as f64).collect(),
            ColumnValues::Float(v) => v.clone(),
        }
    }

    /// Values as `i64`; fails for floating-point leaves.
    pub fn to_i64(&self) -> Result<Vec<i64>> {
        match &self.values {
            ColumnValues::Int(v) => Ok(v.clone()),
            ColumnValues::Float(_) => Err(RootError::TypeMismatch(format!(
                "column '{}' holds {:?} values, not integers",
                self.name, self.leaf_type
            ))),
        }
    }
}

/// Read one column of `tree` from the raw file bytes.
pub(crate) fn read_column(file: &[u8], is_large: bool, tree: &Tree, name: &str) -> Result<Column> {
    let (branch, leaf_idx) =
        tree.resolve_column(name).ok_or_else(|| RootError::BranchNotFound(name.to_string()))?;
    let leaf = &branch.leaves[leaf_idx];

    let leaf_type = match leaf.leaf_type {
        Some(t) if leaf.len == 1 && !leaf.counted => t,
        _ => {
            return Err(RootError::UnsupportedLeaf(format!(
                "{name} ({}, len {}{})",
                leaf.class_name,
                leaf.len,
                if leaf.counted { ", variable length" } else { "" }
            )));
        }
    };
    let (entry_size, offset) = layout(branch, &leaf.name)
        .ok_or_else(|| RootError::UnsupportedLeaf(format!("{name}: branch has no fixed entry layout")))?;

    // fEntries is not trusted beyond what the file could hold.
    let capacity = branch.entries.min((file.len() / entry_size) as u64) as usize;
    let mut values = if leaf_type.is_float() {
        ColumnValues::Float(Vec::with_capacity(capacity))
    } else {
        ColumnValues::Int(Vec::with_capacity(capacity))
    };

    for &seek in &branch.basket_seek {
        let basket = read_basket(file, seek, is_large)?;
        let expected = basket.n_entries * entry_size;
        if basket.data.len() != expected {
            return Err(RootError::Deserialization(format!(
                "basket of '{}' at {seek}: {} data bytes for {} entries of {entry_size} bytes",
                branch.name,
                basket.data.len(),
                basket.n_entries
            )));
        }
        for entry in basket.data.chunks_exact(entry_size) {
            let raw = &entry[offset..offset + leaf_type.byte_size()];
            match &mut values {
                ColumnValues::Float(v) => v.push(decode_float(raw, leaf_type)),
                ColumnValues::Int(v) => v.push(decode_int(raw, leaf_type)),
            }
        }
    }

    let column = Column { name: name.to_string(), leaf_type, values };
    if column.len() as u64 != branch.entries {
        tracing::warn!(
            column = name,
            read = column.len(),
            expected = branch.entries,
            "entry count differs from branch metadata"
        );
    }
    Ok(column)
}

fn layout(branch: &BranchInfo, leaf: &str) -> Option<(usize, usize)> {
    let entry_size = branch.entry_size()?;
    let (_, offset) = branch.leaf_offset(leaf)?;
    (entry_size > 0).then_some((entry_size, offset))
}

fn decode_float(raw: &[u8], t: LeafType) -> f64 {
    match t {
        LeafType::F32 => f32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64,
        _ => f64::from_be_bytes([raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7]]),
    }
}

fn decode_int(raw: &[u8], t: LeafType) -> i64 {
    match t {
        LeafType::I8 => raw[0] as i8 as i64,
        LeafType::U8 => raw[0] as i64,
        LeafType::Bool => (raw[0] != 0) as i64,
        LeafType::I16 => i16::from_be_bytes([raw[0], raw[1]]) as i64,
        LeafType::U16 => u16::from_be_bytes([raw[0], raw[1]]) as i64,
        LeafType::I32 => i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64,
        LeafType::U32 => u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64,
        // u64 values beyond i64::MAX wrap; run numbers and counters never get there.
        LeafType::I64 | LeafType::U64 | LeafType::F32 | LeafType::F64 => {
            i64::from_be_bytes([raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7]])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_decoding_respects_sign() {
        assert_eq!(decode_int(&[0xff], LeafType::I8), -1);
        assert_eq!(decode_int(&[0xff], LeafType::U8), 255);
        assert_eq!(decode_int(&[0xff, 0xfe], LeafType::I16), -2);
        assert_eq!(decode_int(&0xffff_ffffu32.to_be_bytes(), LeafType::U32), 4_294_967_295);
        assert_eq!(decode_int(&(-7i64).to_be_bytes(), LeafType::I64), -7);
        assert_eq!(decode_int(&[2], LeafType::Bool), 1);
    }

    #[test]
    fn float_decoding() {
        assert_eq!(decode_float(&1.5f32.to_be_bytes(), LeafType::F32), 1.5);
        assert_eq!(decode_float(&(-0.25f64).to_be_bytes(), LeafType::F64), -0.25);
    }

    #[test]
    fn float_columns_refuse_integer_view() {
        let c = Column {
            name: "BPIX.x".into(),
            leaf_type: LeafType::F32,
            values: ColumnValues::Float(vec![0.5]),
        };
        assert!(matches!(c.to_i64(), Err(RootError::TypeMismatch(_))));
        assert_eq!(c.to_f64(), vec![0.5]);
        assert_eq!(c.len(), 1);
    }
}
