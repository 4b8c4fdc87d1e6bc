// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use szwrap::{util::HostPath, ArchiveRequest, CancelToken};

use crate::cli::{OptionArgs, RunArgs};

pub fn compress_main(cli: CompressCli) -> Result<()> {
    cli.run.init_logging();

    let sevenzip = cli.run.sevenzip();
    let options = cli.options.resolve()?;
    let request = ArchiveRequest::compress(&cli.input, &cli.output, options);

    if cli.run.dry_run {
        let command = sevenzip.plan(&request)?;
        println!("{command:?}");
        return Ok(());
    }

    let result = sevenzip
        .execute(&request, &CancelToken::new())
        .with_context(|| format!("Compression failed: {:?}", HostPath(&cli.input)))?;

    print!("{}", result.display_text());
    eprintln!("File has been successfully compressed.");

    Ok(())
}

/// Add a file or directory to an archive.
#[derive(Debug, Parser)]
pub struct CompressCli {
    /// File or directory to compress.
    #[arg(short, long, value_parser, value_name = "PATH")]
    input: PathBuf,

    /// Archive to create.
    #[arg(short, long, value_parser, value_name = "FILE")]
    output: PathBuf,

    #[command(flatten)]
    options: OptionArgs,

    #[command(flatten)]
    run: RunArgs,
}
