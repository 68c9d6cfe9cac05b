//! External-file link strategies.
//!
//! A movie can enter the store without its bytes being copied: the entry is
//! then a hard link sharing the source inode, or a symlink pointing back at
//! the source. Symlinks are written relative to the store directory so the
//! whole tree stays valid when moved as a unit.
//!
//! ```ignore
//! use kolekto_cas::link_strategy::strategy_for;
//!
//! strategy_for(true).link_file(source, entry)?;
//! ```

use std::fs;
use std::io;
use std::path::Path;

use crate::paths::relative_path;

/// How an external file is attached to a store entry path.
pub trait LinkStrategy: Send + Sync {
    /// Create `target` pointing at `source`.
    ///
    /// Must fail with `AlreadyExists` rather than replace an existing
    /// `target`: store entries are never overwritten.
    fn link_file(&self, source: &Path, target: &Path) -> io::Result<()>;

    /// Name of this strategy (for logging/debugging)
    fn name(&self) -> &'static str;
}

/// Hard link: the entry shares the source inode. Source and store must be
/// on the same filesystem.
pub struct HardlinkStrategy;

impl LinkStrategy for HardlinkStrategy {
    fn link_file(&self, source: &Path, target: &Path) -> io::Result<()> {
        fs::hard_link(source, target)
    }

    fn name(&self) -> &'static str {
        "hardlink"
    }
}

/// Relative symbolic link from the entry back to the source file.
pub struct SymlinkStrategy;

impl LinkStrategy for SymlinkStrategy {
    fn link_file(&self, source: &Path, target: &Path) -> io::Result<()> {
        let dir = target.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "link target has no parent directory")
        })?;
        let rel = relative_path(dir, source);
        symlink_file(&rel, target)
    }

    fn name(&self) -> &'static str {
        "symlink"
    }
}

/// Create a file symlink at `link` whose stored target is `original`
/// verbatim (no resolution).
#[cfg(unix)]
pub fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
pub fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

/// Strategy for `symlink = true | false`.
pub fn strategy_for(symlink: bool) -> &'static dyn LinkStrategy {
    static HARDLINK: HardlinkStrategy = HardlinkStrategy;
    static SYMLINK: SymlinkStrategy = SymlinkStrategy;
    if symlink {
        &SYMLINK
    } else {
        &HARDLINK
    }
}
