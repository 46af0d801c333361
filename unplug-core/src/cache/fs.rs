//! Filesystem helpers for the cache directory

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

/// Write `bytes` to `dir/name` through a temporary file in the same
/// directory and an atomic rename.
pub fn atomic_write(dir: &Path, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    let target = dir.join(name);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|err| err.error)?;
    Ok(target)
}

/// Fail unless a file can be created in `dir`
pub fn check_writable(dir: &Path) -> io::Result<()> {
    NamedTempFile::new_in(dir).map(drop)
}

/// Delete everything inside `dir` but keep `dir` itself.
///
/// Symlinks are removed, never followed, so a dangling link is just another
/// entry. Returns the number of top-level entries removed.
pub fn empty_directory(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if fs::symlink_metadata(&path)?.is_dir() {
            remove_directory(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }

    Ok(removed)
}

/// Delete `dir` and everything below it
pub fn remove_directory(dir: &Path) -> io::Result<()> {
    empty_directory(dir)?;
    fs::remove_dir(dir)
}

/// Path of `to` relative to `from`, both absolute and canonical, written
/// with `/` separators and a leading `./`.
pub fn relative_dir(from: &Path, to: &Path) -> String {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = vec![".".to_string()];
    parts.extend(from[common..].iter().map(|_| "..".to_string()));
    parts.extend(to[common..].iter().map(|c| c.as_os_str().to_string_lossy().into_owned()));

    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces() {
        let dir = TempDir::new().unwrap();

        let path = atomic_write(dir.path(), "a.html", b"one").unwrap();
        atomic_write(dir.path(), "a.html", b"two").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_empty_directory_nested() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("x/y")).unwrap();
        fs::write(dir.path().join("x/y/z.html"), "z").unwrap();
        fs::write(dir.path().join("a.html"), "a").unwrap();

        assert_eq!(empty_directory(dir.path()).unwrap(), 2);
        assert!(dir.path().is_dir());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_directory_unlinks_symlinks() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("keep.txt"), "keep").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("linked")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        assert_eq!(empty_directory(dir.path()).unwrap(), 2);
        assert!(outside.path().join("keep.txt").exists());
    }

    #[test]
    fn test_remove_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("cache");
        fs::create_dir_all(target.join("sub")).unwrap();

        remove_directory(&target).unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn test_relative_dir() {
        assert_eq!(relative_dir(Path::new("/srv/www"), Path::new("/srv/www/_cache")), "./_cache");
        assert_eq!(relative_dir(Path::new("/srv/www"), Path::new("/srv/www")), ".");
        assert_eq!(relative_dir(Path::new("/srv/www/site"), Path::new("/srv/cache")), "./../../cache");
        assert_eq!(relative_dir(Path::new("/srv"), Path::new("/srv/a/b")), "./a/b");
    }
}
