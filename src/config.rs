//! Queue configuration.
//!
//! A [`QueueConfig`] names the queue (an explicit key, or a path and project
//! id for `ftok(3)`), the creation flags and permission bits passed to
//! `msgget(2)`, and `max_size`: the payload capacity of the handle's buffer
//! and therefore the largest message it can send or receive.

use crate::error::{MqError, Result};
use crate::ipc::{self, OpenFlags};
use libc::key_t;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for opening a [`crate::MessageQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Creation flags for `msgget(2)`.
    pub flags: OpenFlags,
    /// Permission bits, e.g. `0o600`.
    pub permissions: u32,
    /// Size of the largest message this handle can send or receive.
    pub max_size: usize,
    /// Explicit key; `0` means "derive from `path`".
    pub key: key_t,
    /// File used to derive a key when `key` is unset.
    pub path: Option<PathBuf>,
    /// Project id for key derivation.
    pub project_id: i32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            flags: OpenFlags::empty(),
            permissions: crate::defaults::PERMISSIONS,
            max_size: crate::defaults::MAX_SIZE,
            key: 0,
            path: None,
            project_id: crate::defaults::PROJECT_ID,
        }
    }
}

impl QueueConfig {
    /// Address the queue by an explicit key.
    pub fn with_key(key: key_t) -> Self {
        Self {
            key,
            ..Default::default()
        }
    }

    /// Address the queue by a path and project id.
    pub fn with_path(path: impl AsRef<Path>, project_id: i32) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            project_id,
            ..Default::default()
        }
    }

    /// Create the queue if it does not exist.
    pub fn create(mut self) -> Self {
        self.flags |= OpenFlags::CREATE;
        self
    }

    /// Fail if the queue already exists (implies `create`).
    pub fn exclusive(mut self) -> Self {
        self.flags |= OpenFlags::CREATE | OpenFlags::EXCLUSIVE;
        self
    }

    pub fn permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Check flags and permission bits before any syscall is made.
    ///
    /// A missing key source is reported by [`QueueConfig::resolve_key`].
    pub fn validate(&self) -> Result<()> {
        if self.permissions & !0o777 != 0 {
            return Err(MqError::InvalidConfig(format!(
                "permission bits {:#o} exceed 0o777",
                self.permissions
            )));
        }
        if self.flags.contains(OpenFlags::EXCLUSIVE) && !self.flags.contains(OpenFlags::CREATE) {
            return Err(MqError::InvalidConfig(
                "EXCLUSIVE requires CREATE".to_string(),
            ));
        }
        Ok(())
    }

    /// The key this configuration addresses.
    pub fn resolve_key(&self) -> Result<key_t> {
        ipc::resolve_key(self.key, self.path.as_deref(), self.project_id)
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MqError::InvalidConfig(e.to_string()))
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MqError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&contents)
    }
}
