//! # ct-root
//!
//! Native ROOT file reader for cmstools.
//!
//! Walks TDirectory trees and reads numeric columns of TTrees from `.root`
//! files without a ROOT installation. Baskets may be zlib, LZ4, ZSTD or XZ
//! compressed. Only fixed-layout leaves (one scalar per leaf, leaf-list
//! branches included) are decoded.
//!
//! The `fixture` feature adds the `fixture` module, an in-memory writer for test files.
//!
//! ## Example
//!
//! ```no_run
//! use ct_root::RootFile;
//!
//! let f = RootFile::open("PixelBaryCentre.root").unwrap();
//! for key in f.list_keys().unwrap() {
//!     println!("{} ({})", key.name, key.class_name);
//! }
//! let tree = f.get_tree("PixelBaryCentreAnalyzer/PixelBarycentre").unwrap();
//! let runs = f.read_column_i64(&tree, "run").unwrap();
//! let x = f.read_column_f64(&tree, "BPIX.x").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod basket;
pub mod column;
pub mod decompress;
pub mod directory;
pub mod error;
pub mod file;
#[cfg(feature = "fixture")]
pub mod fixture;
pub mod key;
pub mod objects;
pub mod rbuffer;
pub mod tree;

pub use column::{Column, ColumnValues};
pub use directory::Directory;
pub use error::{Result, RootError};
pub use file::RootFile;
pub use key::{Key, KeyInfo};
pub use tree::{BranchInfo, LeafInfo, LeafType, Tree};
