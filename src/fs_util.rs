use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::LottoError;

/// Writes `content` next to `path` and renames it over the target.
///
/// Readers see either the previous file or the complete new one. When any
/// step fails the target is left as it was and the temporary file is removed.
pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), LottoError> {
    let write_err = |message: String| LottoError::DatasetWrite {
        path: path.to_path_buf(),
        message,
    };

    let parent = parent_dir(path);
    fs::create_dir_all(parent.as_std_path()).map_err(|err| write_err(err.to_string()))?;

    let mut temp = Builder::new()
        .prefix(".lotto-sync")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| write_err(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| write_err(err.to_string()))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| write_err(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| write_err(err.error.to_string()))?;
    Ok(())
}

fn parent_dir(path: &Utf8Path) -> Utf8PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_file_name_uses_current_dir() {
        assert_eq!(parent_dir(Utf8Path::new("draw_kor.csv")), Utf8PathBuf::from("."));
        assert_eq!(
            parent_dir(Utf8Path::new("assets/draw_kor.csv")),
            Utf8PathBuf::from("assets")
        );
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("data.csv")).unwrap();
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn failed_rename_keeps_target_and_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "keep").unwrap();
        let path = Utf8PathBuf::from_path_buf(target.clone()).unwrap();

        let err = write_atomic(&path, b"new").unwrap_err();

        assert!(matches!(err, LottoError::DatasetWrite { .. }));
        assert_eq!(fs::read_to_string(target.join("keep.txt")).unwrap(), "keep");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
