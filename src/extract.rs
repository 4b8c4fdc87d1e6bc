// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use szwrap::{util::HostPath, ArchiveOptions, ArchiveRequest, CancelToken};

use crate::cli::RunArgs;

pub fn extract_main(cli: ExtractCli) -> Result<()> {
    cli.run.init_logging();

    let sevenzip = cli.run.sevenzip();
    let options = ArchiveOptions::default().with_password(cli.password.unwrap_or_default());
    let request = ArchiveRequest::extract(&cli.input, &cli.output, options);

    if cli.run.dry_run {
        let command = sevenzip.plan(&request)?;
        println!("{command:?}");
        return Ok(());
    }

    let result = match sevenzip.execute(&request, &CancelToken::new()) {
        Err(e) if e.is_wrong_password() => {
            if let Some(r) = e.execution_result() {
                eprint!("{}", r.display_text());
            }
            bail!("Wrong password. Please try again.");
        }
        r => r.with_context(|| format!("Extraction failed: {:?}", HostPath(&cli.input)))?,
    };

    print!("{}", result.display_text());
    eprintln!("Files have been successfully extracted.");

    Ok(())
}

/// Extract an archive into a directory.
#[derive(Debug, Parser)]
pub struct ExtractCli {
    /// Archive to extract (.7z, .zip, .rar, .tar, .gz, .bz2, .xz).
    #[arg(short, long, value_parser, value_name = "FILE")]
    input: PathBuf,

    /// Directory to extract into.
    #[arg(short, long, value_parser, value_name = "DIR")]
    output: PathBuf,

    /// Archive password.
    ///
    /// For .7z and .zip archives, the password is handed to the archiver
    /// through a temporary file instead of its command line.
    #[arg(short, long, value_name = "PASSWORD")]
    password: Option<String>,

    #[command(flatten)]
    run: RunArgs,
}
