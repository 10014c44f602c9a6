use std::{fs, io};
use std::io::Error;
use std::path::{Path, PathBuf};

/// Image stack extensions, compared case-insensitively
static STACK_EXTENSIONS: [&str; 2] = ["tif", "tiff"];

/// TIFF stacks directly inside `dir`, sorted by path
pub fn get_stack_paths(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut paths = fs::read_dir(dir)?
        .map(|res| res.map(|e| e.path()))
        .collect::<Result<Vec<PathBuf>, io::Error>>()?;
    paths.retain(|path| path.is_file() && is_stack(path));
    paths.sort();
    Ok(paths)
}

pub fn is_stack(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| STACK_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stack() {
        assert!(is_stack(Path::new("a.tif")));
        assert!(is_stack(Path::new("dir/A.TIFF")));
        assert!(is_stack(Path::new("b.Tif")));
        assert!(!is_stack(Path::new("c.png")));
        assert!(!is_stack(Path::new("tif")));
    }

    #[test]
    fn test_get_stack_paths() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.tif", "a.TIFF", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.tif")).unwrap();

        let paths = get_stack_paths(dir.path()).unwrap();
        assert_eq!(paths, vec![dir.path().join("a.TIFF"), dir.path().join("b.tif")]);
    }
}
