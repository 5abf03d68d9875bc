//! YAML config loading.
//!
//! The YAML parser also reads JSON (YAML is a superset), so either format works.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Read and deserialize a YAML (or JSON) file.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::Config(format!("{} is empty", path.display())));
    }
    let value = serde_yaml_ng::from_slice(&bytes)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        name: String,
        #[serde(default)]
        years: BTreeMap<u32, String>,
    }

    fn write_tmp(name: &str, text: &str) -> std::path::PathBuf {
        let p = std::env::temp_dir().join(format!("ct_core_{}_{}", std::process::id(), name));
        std::fs::write(&p, text).unwrap();
        p
    }

    #[test]
    fn reads_yaml_and_json() {
        let y = write_tmp("a.yaml", "name: x\nyears: { 2023: b }\n");
        let s: Sample = read_yaml(&y).unwrap();
        assert_eq!(s.name, "x");
        assert_eq!(s.years.get(&2023).map(String::as_str), Some("b"));

        let j = write_tmp("a.json", &serde_json::json!({"name": "y"}).to_string());
        let s: Sample = read_yaml(&j).unwrap();
        assert_eq!(s, Sample { name: "y".into(), years: BTreeMap::new() });
    }

    #[test]
    fn rejects_unknown_fields_and_empty_files() {
        let p = write_tmp("bad.yaml", "name: x\nextra: 1\n");
        assert!(matches!(read_yaml::<Sample>(&p), Err(Error::Yaml(_))));
        let e = write_tmp("empty.yaml", "  \n");
        assert!(matches!(read_yaml::<Sample>(&e), Err(Error::Config(_))));
    }
}
