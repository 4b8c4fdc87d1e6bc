// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! Default archive options stored as TOML, eg.
//!
//! ```toml
//! format = "7z"
//! level = "Ultra"
//! method = "LZMA2"
//! dictionary_size = "64 MB"
//! word_size = 64
//! solid_block_size = "4 GB"
//! threads = 4
//! encrypt_file_names = false
//! ```
//!
//! Passwords are never read from or written to profiles.

use std::{fs, path::Path};

use crate::{
    error::{Error, Result},
    options::ArchiveOptions,
};

fn profile_error(path: &Path, message: String) -> Error {
    Error::Profile {
        path: path.to_owned(),
        message,
    }
}

pub fn from_str(data: &str) -> Result<ArchiveOptions, toml_edit::de::Error> {
    toml_edit::de::from_str(data)
}

pub fn to_string(options: &ArchiveOptions) -> Result<String, toml_edit::ser::Error> {
    toml_edit::ser::to_string_pretty(options)
}

pub fn read(path: &Path) -> Result<ArchiveOptions> {
    let data = fs::read_to_string(path)
        .map_err(|e| profile_error(path, format!("Failed to read profile: {e}")))?;

    from_str(&data).map_err(|e| profile_error(path, format!("Failed to parse profile: {e}")))
}

pub fn write(path: &Path, options: &ArchiveOptions) -> Result<()> {
    let data = to_string(options)
        .map_err(|e| profile_error(path, format!("Failed to serialize profile: {e}")))?;

    fs::write(path, data).map_err(|e| profile_error(path, format!("Failed to write profile: {e}")))
}
