// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{io, num::NonZeroUsize, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use szwrap::{
    options::{
        ArchiveFormat, ArchiveOptions, CompressionLevel, CompressionMethod, DictionarySize,
        SolidBlockSize, WordSize,
    },
    profile,
    util::HostPath,
    CommandBuilder, Runner, SevenZip,
};
use tracing::{warn, Level};

use crate::{compress, extract};

/// Archive options. Values given here override the profile.
#[derive(Debug, Args)]
pub struct OptionArgs {
    /// TOML file with default archive options.
    #[arg(long, value_parser, value_name = "FILE")]
    profile: Option<PathBuf>,

    /// Archive format.
    #[arg(short = 't', long, value_name = "FORMAT")]
    format: Option<ArchiveFormat>,

    /// Compression level (Store, Fastest, Fast, Normal, Maximum, Ultra).
    ///
    /// Unrecognized levels fall back to Normal.
    #[arg(short, long, value_name = "LEVEL")]
    level: Option<String>,

    /// Compression method (LZMA2, LZMA, PPMd, BZip2).
    #[arg(long, value_name = "METHOD")]
    method: Option<CompressionMethod>,

    /// Dictionary size, eg. "16 MB".
    #[arg(long, value_name = "SIZE")]
    dictionary_size: Option<DictionarySize>,

    /// Word size.
    #[arg(long, value_name = "SIZE")]
    word_size: Option<WordSize>,

    /// Solid block size, eg. "Non-solid" or "4 GB".
    #[arg(long, value_name = "SIZE")]
    solid_block_size: Option<SolidBlockSize>,

    /// Number of CPU threads.
    #[arg(long, value_name = "COUNT")]
    threads: Option<NonZeroUsize>,

    /// Archive password.
    ///
    /// When compressing, the password is passed on the archiver's command
    /// line and is visible in the process list while it runs.
    #[arg(short, long, value_name = "PASSWORD")]
    password: Option<String>,

    /// Encrypt file names (7z only, requires a password).
    #[arg(long)]
    encrypt_file_names: bool,
}

impl OptionArgs {
    pub fn resolve(self) -> Result<ArchiveOptions> {
        let mut options = match &self.profile {
            Some(path) => profile::read(path)
                .with_context(|| format!("Failed to load profile: {:?}", HostPath(path)))?,
            None => ArchiveOptions::default(),
        };

        if let Some(format) = self.format {
            options.format = format;
        }
        if let Some(label) = &self.level {
            options.level = CompressionLevel::from_label_or_default(label);
            if label.parse::<CompressionLevel>().is_err() {
                warn!("Unknown compression level {label:?}, using {}", options.level);
            }
        }
        if self.method.is_some() {
            options.method = self.method;
        }
        if self.dictionary_size.is_some() {
            options.dictionary_size = self.dictionary_size;
        }
        if self.word_size.is_some() {
            options.word_size = self.word_size;
        }
        if self.solid_block_size.is_some() {
            options.solid_block_size = self.solid_block_size;
        }
        if self.threads.is_some() {
            options.threads = self.threads;
        }
        if self.encrypt_file_names {
            options.encrypt_file_names = true;
        }

        Ok(options.with_password(self.password.unwrap_or_default()))
    }
}

/// How the archiver is run.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Archiver executable, looked up in PATH.
    #[arg(long, value_name = "PROGRAM", default_value = CommandBuilder::DEFAULT_PROGRAM)]
    program: String,

    /// Kill the archiver after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Directory for temporary password files.
    #[arg(long, value_parser, value_name = "DIR")]
    password_dir: Option<PathBuf>,

    /// Print the archiver command instead of running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output.
    ///
    /// When specified once, the archiver command and its output will be
    /// printed out. When specified twice, trace output is enabled too.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl RunArgs {
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .try_init();
    }

    pub fn sevenzip(&self) -> SevenZip {
        let mut runner = Runner::new();
        if let Some(dir) = &self.password_dir {
            runner = runner.with_credential_dir(dir);
        }
        if let Some(secs) = self.timeout {
            runner = runner.with_timeout(Duration::from_secs(secs));
        }

        SevenZip::new(CommandBuilder::new(&self.program), runner)
    }
}

/// Write archive options to a profile.
#[derive(Debug, Parser)]
pub struct ProfileCli {
    /// Output profile file.
    #[arg(short, long, value_parser, value_name = "FILE")]
    output: PathBuf,

    #[command(flatten)]
    options: OptionArgs,
}

fn profile_main(cli: ProfileCli) -> Result<()> {
    let options = cli.options.resolve()?;

    profile::write(&cli.output, &options)
        .with_context(|| format!("Failed to save profile: {:?}", HostPath(&cli.output)))
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Compress(compress::CompressCli),
    Extract(extract::ExtractCli),
    Profile(ProfileCli),
}

#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Compress(c) => compress::compress_main(c),
        Command::Extract(c) => extract::extract_main(c),
        Command::Profile(c) => profile_main(c),
    }
}
