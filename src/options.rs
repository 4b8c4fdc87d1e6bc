// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{fmt, num::NonZeroUsize, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A label did not match any of the values offered for an option.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind}: {label:?} (expected one of: {expected})")]
pub struct ParseLabelError {
    kind: &'static str,
    label: String,
    expected: String,
}

impl ParseLabelError {
    fn new<T: fmt::Display>(kind: &'static str, label: &str, all: &[T]) -> Self {
        let expected = all
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            kind,
            label: label.to_owned(),
            expected,
        }
    }
}

fn parse_label<T: Copy + fmt::Display>(
    kind: &'static str,
    all: &[T],
    label: &str,
) -> Result<T, ParseLabelError> {
    all.iter()
        .copied()
        .find(|v| v.to_string() == label)
        .ok_or_else(|| ParseLabelError::new(kind, label, all))
}

/// Archive type passed to the archiver via `-t`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ArchiveFormat {
    #[default]
    #[serde(rename = "7z")]
    SevenZip,
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "gzip")]
    Gzip,
    #[serde(rename = "bzip2")]
    Bzip2,
    #[serde(rename = "tar")]
    Tar,
}

impl ArchiveFormat {
    pub const ALL: [Self; 5] = [Self::SevenZip, Self::Zip, Self::Gzip, Self::Bzip2, Self::Tar];

    /// Value used in the `-t<type>` switch.
    pub fn type_switch(self) -> &'static str {
        match self {
            Self::SevenZip => "7z",
            Self::Zip => "zip",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Tar => "tar",
        }
    }

    /// Guess the format from a file extension. `.rar` and `.xz` are readable
    /// by the archiver but have no corresponding format here.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();

        match ext.as_str() {
            "7z" => Some(Self::SevenZip),
            "zip" => Some(Self::Zip),
            "gz" => Some(Self::Gzip),
            "bz2" => Some(Self::Bzip2),
            "tar" => Some(Self::Tar),
            _ => None,
        }
    }

    /// Whether the archiver accepts the password through `-p@<file>` for this
    /// format.
    pub fn supports_password_file(self) -> bool {
        matches!(self, Self::SevenZip | Self::Zip)
    }

    pub(crate) fn supports_password(self) -> bool {
        matches!(self, Self::SevenZip | Self::Zip)
    }

    pub(crate) fn supports_method(self, method: CompressionMethod) -> bool {
        match self {
            Self::SevenZip => true,
            Self::Zip => method != CompressionMethod::Lzma2,
            _ => false,
        }
    }

    pub(crate) fn supports_dictionary_size(self) -> bool {
        matches!(self, Self::SevenZip | Self::Zip)
    }

    pub(crate) fn supports_word_size(self) -> bool {
        matches!(self, Self::SevenZip | Self::Zip | Self::Gzip)
    }

    pub(crate) fn supports_solid_blocks(self) -> bool {
        self == Self::SevenZip
    }

    pub(crate) fn supports_threads(self) -> bool {
        matches!(self, Self::SevenZip | Self::Zip | Self::Bzip2)
    }

    pub(crate) fn supports_header_encryption(self) -> bool {
        self == Self::SevenZip
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_switch())
    }
}

impl FromStr for ArchiveFormat {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label("archive format", &Self::ALL, s)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum CompressionLevel {
    Store,
    Fastest,
    Fast,
    #[default]
    Normal,
    Maximum,
    Ultra,
}

impl CompressionLevel {
    pub const ALL: [Self; 6] = [
        Self::Store,
        Self::Fastest,
        Self::Fast,
        Self::Normal,
        Self::Maximum,
        Self::Ultra,
    ];

    /// Numeric value for `-mx=`.
    pub fn numeric(self) -> u8 {
        match self {
            Self::Store => 0,
            Self::Fastest => 1,
            Self::Fast => 3,
            Self::Normal => 5,
            Self::Maximum => 7,
            Self::Ultra => 9,
        }
    }

    /// Lenient lookup that falls back to [`Self::Normal`] for labels that are
    /// not recognized.
    pub fn from_label_or_default(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for CompressionLevel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label("compression level", &Self::ALL, s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum CompressionMethod {
    #[serde(rename = "LZMA2")]
    Lzma2,
    #[serde(rename = "LZMA")]
    Lzma,
    #[serde(rename = "PPMd")]
    Ppmd,
    #[serde(rename = "BZip2")]
    Bzip2,
}

impl CompressionMethod {
    pub const ALL: [Self; 4] = [Self::Lzma2, Self::Lzma, Self::Ppmd, Self::Bzip2];

    pub fn label(self) -> &'static str {
        match self {
            Self::Lzma2 => "LZMA2",
            Self::Lzma => "LZMA",
            Self::Ppmd => "PPMd",
            Self::Bzip2 => "BZip2",
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CompressionMethod {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label("compression method", &Self::ALL, s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DictionarySize {
    #[serde(rename = "64 KB")]
    Kib64,
    #[serde(rename = "1 MB")]
    Mib1,
    #[serde(rename = "2 MB")]
    Mib2,
    #[serde(rename = "4 MB")]
    Mib4,
    #[serde(rename = "8 MB")]
    Mib8,
    #[serde(rename = "16 MB")]
    Mib16,
    #[serde(rename = "32 MB")]
    Mib32,
    #[serde(rename = "64 MB")]
    Mib64,
}

impl DictionarySize {
    pub const ALL: [Self; 8] = [
        Self::Kib64,
        Self::Mib1,
        Self::Mib2,
        Self::Mib4,
        Self::Mib8,
        Self::Mib16,
        Self::Mib32,
        Self::Mib64,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Kib64 => "64 KB",
            Self::Mib1 => "1 MB",
            Self::Mib2 => "2 MB",
            Self::Mib4 => "4 MB",
            Self::Mib8 => "8 MB",
            Self::Mib16 => "16 MB",
            Self::Mib32 => "32 MB",
            Self::Mib64 => "64 MB",
        }
    }

    /// Size suffix understood by `-md=`.
    pub fn switch_value(self) -> &'static str {
        match self {
            Self::Kib64 => "64k",
            Self::Mib1 => "1m",
            Self::Mib2 => "2m",
            Self::Mib4 => "4m",
            Self::Mib8 => "8m",
            Self::Mib16 => "16m",
            Self::Mib32 => "32m",
            Self::Mib64 => "64m",
        }
    }
}

impl fmt::Display for DictionarySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DictionarySize {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label("dictionary size", &Self::ALL, s)
    }
}

/// Fast bytes (`-mfb=`). Only the values the archiver's own UI offers are
/// accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct WordSize(u16);

impl WordSize {
    pub const VALUES: [u16; 11] = [8, 12, 16, 24, 32, 48, 64, 96, 128, 192, 256];

    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for WordSize {
    type Error = ParseLabelError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if Self::VALUES.contains(&value) {
            Ok(Self(value))
        } else {
            Err(ParseLabelError::new(
                "word size",
                &value.to_string(),
                &Self::VALUES,
            ))
        }
    }
}

impl From<WordSize> for u16 {
    fn from(value: WordSize) -> Self {
        value.0
    }
}

impl fmt::Display for WordSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WordSize {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<u16>()
            .map_err(|_| ParseLabelError::new("word size", s, &Self::VALUES))?;

        Self::try_from(value)
    }
}

/// Solid block size (`-ms=`). Sizes are powers of two from 2 MiB to 64 GiB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum SolidBlockSize {
    NonSolid,
    /// Block size as a power of two, in MiB.
    Mib(u32),
}

impl SolidBlockSize {
    const MIN_MIB: u32 = 2;
    const MAX_MIB: u32 = 64 * 1024;

    /// Whether the size is one of the offered values: a power of two between
    /// 2 MiB and 64 GiB.
    pub fn is_valid(self) -> bool {
        match self {
            Self::NonSolid => true,
            Self::Mib(m) => m.is_power_of_two() && (Self::MIN_MIB..=Self::MAX_MIB).contains(&m),
        }
    }

    pub fn all() -> impl Iterator<Item = Self> {
        std::iter::once(Self::NonSolid).chain(
            (1..)
                .map(|shift| 1u32 << shift)
                .take_while(|&m| m <= Self::MAX_MIB)
                .map(Self::Mib),
        )
    }

    /// Value understood by `-ms=`.
    pub fn switch_value(self) -> String {
        match self {
            Self::NonSolid => "off".to_owned(),
            Self::Mib(m) if m >= 1024 => format!("{}g", m / 1024),
            Self::Mib(m) => format!("{m}m"),
        }
    }
}

impl fmt::Display for SolidBlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonSolid => f.write_str("Non-solid"),
            Self::Mib(m) if *m >= 1024 => write!(f, "{} GB", m / 1024),
            Self::Mib(m) => write!(f, "{m} MB"),
        }
    }
}

impl FromStr for SolidBlockSize {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all().find(|v| v.to_string() == s).ok_or_else(|| {
            let all = Self::all().collect::<Vec<_>>();
            ParseLabelError::new("solid block size", s, &all)
        })
    }
}

impl TryFrom<String> for SolidBlockSize {
    type Error = ParseLabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SolidBlockSize> for String {
    fn from(value: SolidBlockSize) -> Self {
        value.to_string()
    }
}

/// Options for a single compress or extract request. Fields left as `None`
/// keep the archiver's own default and produce no argument.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArchiveOptions {
    #[serde(default)]
    pub format: ArchiveFormat,

    #[serde(default)]
    pub level: CompressionLevel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<CompressionMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary_size: Option<DictionarySize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_size: Option<WordSize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solid_block_size: Option<SolidBlockSize>,

    /// Number of CPU threads. Must not exceed the available parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<NonZeroUsize>,

    /// Never written to or read from profiles.
    #[serde(skip)]
    pub password: Option<String>,

    #[serde(default)]
    pub encrypt_file_names: bool,
}

impl ArchiveOptions {
    /// Set the password. An empty string clears it, which is how an empty
    /// password field is meant to be read.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }
}

impl fmt::Debug for ArchiveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveOptions")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("method", &self.method)
            .field("dictionary_size", &self.dictionary_size)
            .field("word_size", &self.word_size)
            .field("solid_block_size", &self.solid_block_size)
            .field("threads", &self.threads)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("encrypt_file_names", &self.encrypt_file_names)
            .finish()
    }
}
