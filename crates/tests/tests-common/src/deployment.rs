//! Deployment functions used across test cases.

use std::path::{Path, PathBuf};

pub const SAMPLE_CONFIGURATION: &str = "sample-configuration";

/// Find a configuration directory shipped with this crate, via the crate root
/// provided by `cargo test`.
pub fn get_configuration_directory(name: &str) -> PathBuf {
    let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    d.push("static");
    d.push(name);
    d
}

/// Copy a shipped configuration directory into a fresh temporary directory,
/// so that tests may modify it.
pub fn copy_configuration_directory(name: &str) -> anyhow::Result<tempfile::TempDir> {
    let destination = tempfile::tempdir()?;
    copy_recursively(&get_configuration_directory(name), destination.path())?;
    Ok(destination)
}

fn copy_recursively(from: &Path, to: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_recursively(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
