use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use hfpi_model::{CaseParameters, CaseResult};
use log::debug;
use tempfile::Builder;

use crate::error::{Result, StoreError};

const MAGIC: &[u8; 4] = b"HFPI";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;
pub const RESULT_EXTENSION: &str = "bin";

/// Writes `result` to `path`, publishing it with an atomic rename so that
/// readers see either the previous file or the complete new one.
pub fn save_case_result(path: impl AsRef<Path>, result: &CaseResult) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;

    let tmp = Builder::new()
        .prefix(".hfpi-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|err| StoreError::io(dir, err))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        writer
            .write_all(MAGIC)
            .and_then(|_| writer.write_all(&FORMAT_VERSION.to_le_bytes()))
            .map_err(|err| StoreError::io(tmp.path(), err))?;
        bincode::serialize_into(&mut writer, result)?;
        writer.flush().map_err(|err| StoreError::io(tmp.path(), err))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|err| StoreError::io(tmp.path(), err))?;
    tmp.persist(path)
        .map_err(|err| StoreError::io(path, err.error))?;
    debug!("wrote case result {}", path.display());
    Ok(())
}

/// Reads a result written by [`save_case_result`], rejecting anything that
/// does not decode to a structurally valid result.
pub fn load_case_result(path: impl AsRef<Path>) -> Result<CaseResult> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| StoreError::io(path, err))?;
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(StoreError::BadHeader {
            path: path.to_path_buf(),
        });
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..HEADER_LEN]);
    let found = u32::from_le_bytes(version);
    if found != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            found,
        });
    }

    let result: CaseResult =
        bincode::deserialize(&bytes[HEADER_LEN..]).map_err(|err| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    result
        .validate()
        .map_err(|err| StoreError::corrupt(path, err))?;
    Ok(result)
}

/// Directory of case results, one file per [`CaseParameters::key`].
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| StoreError::io(&root, err))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, params: &CaseParameters) -> PathBuf {
        self.root.join(params.file_name())
    }

    pub fn contains(&self, params: &CaseParameters) -> bool {
        self.path_for(params).is_file()
    }

    pub fn save(&self, params: &CaseParameters, result: &CaseResult) -> Result<PathBuf> {
        let path = self.path_for(params);
        save_case_result(&path, result)?;
        Ok(path)
    }

    pub fn load(&self, params: &CaseParameters) -> Result<CaseResult> {
        load_case_result(self.path_for(params))
    }

    /// Keys of every published result file in the store.
    pub fn completed_keys(&self) -> Result<BTreeSet<String>> {
        let entries = fs::read_dir(&self.root).map_err(|err| StoreError::io(&self.root, err))?;
        let mut keys = BTreeSet::new();
        for entry in entries {
            let path = entry.map_err(|err| StoreError::io(&self.root, err))?.path();
            if path
                .extension()
                .is_some_and(|ext| ext == RESULT_EXTENSION)
                && let Some(stem) = path.file_stem()
            {
                keys.insert(stem.to_string_lossy().into_owned());
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfpi_model::Axes;
    use nalgebra::DMatrix;
    use std::io;

    fn sample_result() -> CaseResult {
        let m = |seed: f64| DMatrix::from_fn(5, 3, |r, c| seed * (r as f64 + 1.0) - c as f64 * 0.1);
        CaseResult::new(
            Axes {
                x: m(1e-3),
                y: m(-2e-3),
                z: m(1e-5),
            },
            Axes {
                x: m(1e4),
                y: m(2.5e4),
                z: m(-3e5),
            },
        )
        .unwrap()
    }

    #[test]
    fn roundtrip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("case.bin");
        let result = sample_result();

        save_case_result(&path, &result).expect("save should succeed");
        let loaded = load_case_result(&path).expect("load should succeed");
        assert_eq!(loaded, result);
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_case_result(dir.path().join("missing.bin")).expect_err("should fail");
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn load_fails_for_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.bin");
        fs::write(&path, b"not a result at all").unwrap();
        let err = load_case_result(&path).expect_err("should fail");
        assert!(matches!(err, StoreError::BadHeader { .. }));
    }

    #[test]
    fn load_fails_for_truncated_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.bin");
        save_case_result(&path, &sample_result()).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        let err = load_case_result(&path).expect_err("should fail");
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let params = CaseParameters::new(0.0, 0.02, 50.0);
        store.save(&params, &sample_result()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![params.file_name()]);
        assert!(store.contains(&params));
        assert_eq!(
            store.completed_keys().unwrap().into_iter().collect::<Vec<_>>(),
            vec![params.key()]
        );
    }
}
