// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! Compress and extract files by running an external 7-Zip compatible
//! archiver. The options of a request are translated into arguments by
//! [`CommandBuilder`] and executed without a shell by [`Runner`].

pub mod command;
pub mod credential;
pub mod error;
pub mod options;
pub mod profile;
pub mod runner;
pub mod sevenzip;
pub mod util;

pub use command::{Action, Arg, ArchiveRequest, CommandBuilder, CommandLine};
pub use error::{Error, Result};
pub use options::{
    ArchiveFormat, ArchiveOptions, CompressionLevel, CompressionMethod, DictionarySize,
    SolidBlockSize, WordSize,
};
pub use runner::{CancelToken, ExecutionResult, FailureKind, Runner};
pub use sevenzip::SevenZip;
