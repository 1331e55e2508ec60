//! Key resolution.
//!
//! A queue is addressed by a `key_t`. Callers either supply one directly or
//! let `ftok(3)` derive it from a path's device and inode plus the low bits
//! of a project id, which lets unrelated processes rendezvous on the same
//! queue by agreeing on a file.

use crate::error::{MqError, Result};
use libc::key_t;
use nix::errno::Errno;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use tracing::trace;

/// Return `explicit_key` when it is non-zero, otherwise derive one from
/// `path` and `project_id`.
///
/// Zero is `IPC_PRIVATE` to the kernel and is treated as "unset" here.
pub fn resolve_key(explicit_key: key_t, path: Option<&Path>, project_id: i32) -> Result<key_t> {
    if explicit_key != 0 {
        return Ok(explicit_key);
    }

    match path {
        Some(path) => derive_key(path, project_id),
        None => Err(MqError::KeyDerivation {
            path: Default::default(),
            project_id,
            source: Errno::ENOENT,
        }),
    }
}

/// Derive a key with `ftok(3)`.
pub fn derive_key(path: &Path, project_id: i32) -> Result<key_t> {
    let key_error = |source| MqError::KeyDerivation {
        path: path.to_path_buf(),
        project_id,
        source,
    };

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| key_error(Errno::EINVAL))?;

    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
    let res = unsafe { libc::ftok(c_path.as_ptr(), project_id) };
    let key = Errno::result(res).map_err(key_error)?;

    trace!("Derived key {:#x} from {:?} (project id {})", key, path, project_id);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_key_is_returned_unchanged() {
        assert_eq!(resolve_key(0x12345, None, 1).unwrap(), 0x12345);
        assert_eq!(
            resolve_key(-42, Some(Path::new("/i dont exist")), 1).unwrap(),
            -42
        );
    }

    #[test]
    fn test_missing_path_fails() {
        let err = derive_key(Path::new("/i dont exist"), 1).unwrap_err();
        match err {
            MqError::KeyDerivation {
                path, project_id, ..
            } => {
                assert_eq!(path, Path::new("/i dont exist"));
                assert_eq!(project_id, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unset_key_without_path_fails() {
        assert!(matches!(
            resolve_key(0, None, 1),
            Err(MqError::KeyDerivation { .. })
        ));
    }

    #[test]
    fn test_interior_nul_is_rejected() {
        let err = derive_key(Path::new("bad\0path"), 1).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(Errno::EINVAL as i32));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let first = derive_key(file.path(), 7).unwrap();
        let second = resolve_key(0, Some(file.path()), 7).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, derive_key(file.path(), 8).unwrap());
    }
}
