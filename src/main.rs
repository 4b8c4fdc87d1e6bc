// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

mod cli;
mod compress;
mod extract;

fn main() {
    if let Err(e) = cli::main() {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}
