// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    fmt,
    io::{self, Write},
    path::Path,
};

use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

use crate::util::HostPath;

const PREFIX: &str = ".szwrap-pw-";

/// Password written to a uniquely named file for `-p@<path>`. The file is
/// created with owner-only permissions and removed when this is dropped.
pub struct CredentialFile {
    path: Option<TempPath>,
}

impl CredentialFile {
    pub fn create_in(dir: &Path, password: &str) -> io::Result<Self> {
        let mut file = Builder::new().prefix(PREFIX).tempfile_in(dir)?;

        // No trailing newline. The archiver reads the file contents verbatim.
        file.write_all(password.as_bytes())?;
        file.as_file().sync_all()?;

        // Close our fd so that the archiver can open the file (on Windows).
        let path = file.into_temp_path();

        debug!("Created password file: {:?}", HostPath(&path));

        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    /// Delete the file now, reporting failures instead of ignoring them.
    pub fn close(mut self) -> io::Result<()> {
        match self.path.take() {
            Some(p) => p.close(),
            None => Ok(()),
        }
    }
}

impl Drop for CredentialFile {
    fn drop(&mut self) {
        if let Some(p) = self.path.take() {
            let path = HostPath(p.to_path_buf());

            if let Err(e) = p.close() {
                warn!("Failed to delete password file: {path:?}: {e}");
            }
        }
    }
}

impl fmt::Debug for CredentialFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialFile")
            .field("path", &HostPath(self.path()))
            .finish()
    }
}
