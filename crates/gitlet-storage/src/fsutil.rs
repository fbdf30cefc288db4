//! Filesystem helpers.

use std::fs;
use std::io;
use std::path::Path;

/// Permission bits for every directory this tool creates.
#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Creates a single directory with permissions 0755.
///
/// The final bits are pinned explicitly rather than left to the process
/// umask, so repository and working-tree directories come out 0755 even
/// under a permissive umask.
pub fn create_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path)?;

    // mkdir filters the requested mode through the umask; set the final
    // bits afterwards.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(DIR_MODE))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub");
        create_dir(&path).unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn test_create_dir_existing_fails() {
        let dir = TempDir::new().unwrap();
        assert!(create_dir(dir.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_create_dir_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub");
        create_dir(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
