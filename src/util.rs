// SPDX-FileCopyrightText: 2023-2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use core::fmt;
use std::{
    ffi::{OsStr, OsString},
    path::Path,
};

/// Build a single argument from a switch and a value, eg. `-o` + `/tmp/out`.
/// The value is never split or quoted, so it stays one argument no matter
/// what characters it contains.
pub fn switch_with_value(switch: &str, value: impl AsRef<OsStr>) -> OsString {
    let value = value.as_ref();
    let mut arg = OsString::with_capacity(switch.len() + value.len());
    arg.push(switch);
    arg.push(value);
    arg
}

/// Whether the path is empty, which is what an unset path field looks like.
pub fn is_empty_path(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

/// Whether the path would be read as a switch if passed as an argument.
pub fn starts_with_dash(path: &Path) -> bool {
    path.as_os_str().as_encoded_bytes().first() == Some(&b'-')
}

/// Format host system path for printing.
pub struct HostPath<P: AsRef<Path>>(pub P);

impl<P: AsRef<Path>> fmt::Debug for HostPath<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Host]{:?}", self.0.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_keeps_value_intact() {
        assert_eq!(
            switch_with_value("-o", "/tmp/a dir; rm -rf ~"),
            OsString::from("-o/tmp/a dir; rm -rf ~")
        );
    }

    #[test]
    fn empty_path() {
        assert!(is_empty_path(Path::new("")));
        assert!(!is_empty_path(Path::new(".")));
    }

    #[test]
    fn leading_dash() {
        assert!(starts_with_dash(Path::new("-sdel")));
        assert!(!starts_with_dash(Path::new("./-sdel")));
        assert!(!starts_with_dash(Path::new("/tmp/a-b")));
        assert!(!starts_with_dash(Path::new("")));
    }
}
