// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{runner::ExecutionResult, util::HostPath};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected while building the command. No process was started.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The archiver could not be started at all.
    #[error("Failed to launch {program:?}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The archiver ran and exited with a non-zero status.
    #[error("{}", .result.display_text())]
    ToolReported { result: ExecutionResult },

    /// The archiver reported that the password was wrong.
    #[error("{}", .result.display_text())]
    WrongPassword { result: ExecutionResult },

    #[error("Failed to write password file: {0}")]
    Credential(#[source] io::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Archiver was cancelled")]
    Cancelled,

    #[error("Archiver timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Profile {:?}: {message}", HostPath(.path))]
    Profile { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOptions(message.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this is the wrong-password case that a front end should
    /// report with its own message.
    pub fn is_wrong_password(&self) -> bool {
        matches!(self, Self::WrongPassword { .. })
    }

    /// Captured output of the archiver, if it ran to completion.
    pub fn execution_result(&self) -> Option<&ExecutionResult> {
        match self {
            Self::ToolReported { result } | Self::WrongPassword { result } => Some(result),
            _ => None,
        }
    }
}
