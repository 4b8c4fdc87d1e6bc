// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{ffi::OsString, path::Path, process::Command};

use crate::{
    command::{ArchiveRequest, CommandBuilder, CommandLine},
    error::Result,
    options::ArchiveOptions,
    runner::{CancelToken, ExecutionResult, Runner},
};

/// Front end agnostic entry point: build the command for a request and run
/// it.
#[derive(Clone, Debug, Default)]
pub struct SevenZip {
    builder: CommandBuilder,
    runner: Runner,
}

impl SevenZip {
    pub fn new(builder: CommandBuilder, runner: Runner) -> Self {
        Self { builder, runner }
    }

    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self::new(CommandBuilder::new(program), Runner::new())
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn is_available(&self) -> bool {
        Runner::locate(self.builder.program()).is_some()
    }

    /// First non-empty line of the archiver's banner, eg.
    /// `7-Zip 23.01 (x64) : Copyright (c) 1999-2023 Igor Pavlov : 2023-06-20`.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(self.builder.program()).output().ok()?;

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_owned)
    }

    /// Build the command without running anything.
    pub fn plan(&self, request: &ArchiveRequest) -> Result<CommandLine> {
        self.builder.build(request)
    }

    /// Run a request. Invalid options are rejected before any process is
    /// started. Failures reported by the archiver come back as
    /// [`crate::Error::ToolReported`] or [`crate::Error::WrongPassword`].
    pub fn execute(
        &self,
        request: &ArchiveRequest,
        cancel: &CancelToken,
    ) -> Result<ExecutionResult> {
        let command = self.builder.build(request)?;

        self.runner.run(&command, cancel)?.into_checked()
    }

    pub fn compress(
        &self,
        input: &Path,
        output: &Path,
        options: ArchiveOptions,
    ) -> Result<ExecutionResult> {
        let request = ArchiveRequest::compress(input, output, options);
        self.execute(&request, &CancelToken::new())
    }

    pub fn extract(
        &self,
        input: &Path,
        output_dir: &Path,
        password: Option<&str>,
    ) -> Result<ExecutionResult> {
        let options = ArchiveOptions::default().with_password(password.unwrap_or_default());
        let request = ArchiveRequest::extract(input, output_dir, options);
        self.execute(&request, &CancelToken::new())
    }
}
