// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    ffi::OsString,
    fmt,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    thread,
};

use crate::{
    error::{Error, Result},
    options::{ArchiveFormat, ArchiveOptions},
    util::{self, HostPath},
};

/// Extensions accepted for extraction.
pub const EXTRACTABLE_EXTENSIONS: [&str; 7] = ["7z", "zip", "rar", "tar", "gz", "bz2", "xz"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Compress,
    Extract,
}

#[derive(Clone, Debug)]
pub struct ArchiveRequest {
    pub action: Action,
    /// File or directory to compress, or the archive to extract.
    pub input: PathBuf,
    /// Archive to create, or the directory to extract into.
    pub output: PathBuf,
    pub options: ArchiveOptions,
}

impl ArchiveRequest {
    pub fn compress(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        options: ArchiveOptions,
    ) -> Self {
        Self {
            action: Action::Compress,
            input: input.into(),
            output: output.into(),
            options,
        }
    }

    pub fn extract(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        options: ArchiveOptions,
    ) -> Self {
        Self {
            action: Action::Extract,
            input: input.into(),
            output: output.into(),
            options,
        }
    }
}

/// A single argument for the archiver.
#[derive(Clone, PartialEq, Eq)]
pub enum Arg {
    Literal(OsString),
    /// `-p<password>`. The password is visible to anyone who can list the
    /// host's processes while the archiver runs, so this is only used when
    /// the archiver can't read the password from a file.
    InlinePassword(String),
    /// `-p@<path>`. The runner writes the password to a credential file and
    /// fills in the path right before spawning.
    PasswordFile(String),
}

impl Arg {
    fn literal(s: impl Into<OsString>) -> Self {
        Self::Literal(s.into())
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s:?}"),
            Self::InlinePassword(_) => f.write_str("\"-p<redacted>\""),
            Self::PasswordFile(_) => f.write_str("\"-p@<password file>\""),
        }
    }
}

/// Program and arguments for one archiver invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: OsString,
    args: Vec<Arg>,
}

impl CommandLine {
    pub fn new(program: impl Into<OsString>, args: Vec<Arg>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Password that must be written to a credential file before running.
    pub fn password_file_secret(&self) -> Option<&str> {
        self.args.iter().find_map(|a| match a {
            Arg::PasswordFile(p) => Some(p.as_str()),
            _ => None,
        })
    }

    /// Produce the final argument list. `password_file` must be provided when
    /// [`Self::password_file_secret`] returns a value.
    pub fn render(&self, password_file: Option<&Path>) -> Result<Vec<OsString>> {
        self.args
            .iter()
            .map(|a| match a {
                Arg::Literal(s) => Ok(s.clone()),
                Arg::InlinePassword(p) => Ok(util::switch_with_value("-p", p)),
                Arg::PasswordFile(_) => password_file
                    .map(|path| util::switch_with_value("-p@", path))
                    .ok_or_else(|| Error::invalid("No password file for -p@ argument")),
            })
            .collect()
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg:?}")?;
        }
        Ok(())
    }
}

/// Reject passwords that could change how the archiver parses its arguments.
fn validate_password(password: &str, inline: bool) -> Result<()> {
    if password.is_empty() {
        return Err(Error::invalid("Password is empty"));
    } else if password.chars().any(char::is_control) {
        return Err(Error::invalid(
            "Password contains control characters or line breaks",
        ));
    } else if inline && password.starts_with('@') {
        // -p@... is read as a password file path.
        return Err(Error::invalid(
            "Password passed on the command line cannot start with '@'",
        ));
    }

    Ok(())
}

fn unsupported(option: &str, format: ArchiveFormat) -> Error {
    Error::invalid(format!("{option} is not supported for {format} archives"))
}

/// Translates [`ArchiveRequest`]s into [`CommandLine`]s. This never touches
/// the filesystem or starts a process.
#[derive(Clone, Debug)]
pub struct CommandBuilder {
    program: OsString,
    max_threads: NonZeroUsize,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl CommandBuilder {
    pub const DEFAULT_PROGRAM: &'static str = "7z";

    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            max_threads: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Override the thread count ceiling, which defaults to the number of
    /// CPUs available when the builder was created.
    pub fn with_max_threads(mut self, max_threads: NonZeroUsize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn build(&self, request: &ArchiveRequest) -> Result<CommandLine> {
        if util::is_empty_path(&request.input) {
            return Err(Error::invalid("No input path given"));
        } else if util::is_empty_path(&request.output) {
            return Err(Error::invalid("No output path given"));
        }

        // The archiver parses any argument starting with '-' as a switch.
        for path in [&request.input, &request.output] {
            if util::starts_with_dash(path) {
                return Err(Error::invalid(format!(
                    "Path cannot start with '-': {:?}",
                    HostPath(path)
                )));
            }
        }

        let args = match request.action {
            Action::Compress => self.compress_args(request)?,
            Action::Extract => self.extract_args(request)?,
        };

        Ok(CommandLine::new(self.program.clone(), args))
    }

    /// `a -t<format> -mx=<level> [-m...] [-p<password>] <output> <input>`
    fn compress_args(&self, request: &ArchiveRequest) -> Result<Vec<Arg>> {
        let options = &request.options;
        let format = options.format;

        let mut args = vec![
            Arg::literal("a"),
            Arg::literal(format!("-t{}", format.type_switch())),
            Arg::literal(format!("-mx={}", options.level.numeric())),
        ];

        if let Some(method) = options.method {
            if !format.supports_method(method) {
                return Err(unsupported(&format!("Compression method {method}"), format));
            }

            let switch = if format == ArchiveFormat::SevenZip {
                "-m0"
            } else {
                "-mm"
            };
            args.push(Arg::literal(format!("{switch}={method}")));
        }

        if let Some(size) = options.dictionary_size {
            if !format.supports_dictionary_size() {
                return Err(unsupported("Dictionary size", format));
            }
            args.push(Arg::literal(format!("-md={}", size.switch_value())));
        }

        if let Some(size) = options.word_size {
            if !format.supports_word_size() {
                return Err(unsupported("Word size", format));
            }
            args.push(Arg::literal(format!("-mfb={size}")));
        }

        if let Some(size) = options.solid_block_size {
            if !format.supports_solid_blocks() {
                return Err(unsupported("Solid block size", format));
            } else if !size.is_valid() {
                return Err(Error::invalid(format!("Invalid solid block size: {size:?}")));
            }
            args.push(Arg::literal(format!("-ms={}", size.switch_value())));
        }

        if let Some(threads) = options.threads {
            if !format.supports_threads() {
                return Err(unsupported("Thread count", format));
            }
            if threads > self.max_threads {
                return Err(Error::invalid(format!(
                    "Thread count {threads} exceeds available CPUs ({})",
                    self.max_threads
                )));
            }
            args.push(Arg::literal(format!("-mmt={threads}")));
        }

        if options.encrypt_file_names {
            if !format.supports_header_encryption() {
                return Err(unsupported("File name encryption", format));
            } else if options.password.is_none() {
                return Err(Error::invalid("File name encryption requires a password"));
            }
            args.push(Arg::literal("-mhe=on"));
        }

        if let Some(password) = &options.password {
            if !format.supports_password() {
                return Err(unsupported("Password protection", format));
            }
            validate_password(password, true)?;
            args.push(Arg::InlinePassword(password.clone()));
        }

        args.push(Arg::literal(&request.output));
        args.push(Arg::literal(&request.input));

        Ok(args)
    }

    /// `x <input> -o<output> -y [-p<password> | -p@<file> | -p]`
    fn extract_args(&self, request: &ArchiveRequest) -> Result<Vec<Arg>> {
        let input = &request.input;

        let extractable = input
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| EXTRACTABLE_EXTENSIONS.contains(&e.as_str()));
        if !extractable {
            return Err(Error::invalid(format!(
                "Not a supported archive ({}): {:?}",
                EXTRACTABLE_EXTENSIONS.map(|e| format!(".{e}")).join(", "),
                HostPath(input),
            )));
        }

        let mut args = vec![
            Arg::literal("x"),
            Arg::literal(input),
            Arg::Literal(util::switch_with_value("-o", &request.output)),
            Arg::literal("-y"),
        ];

        match &request.options.password {
            None => args.push(Arg::literal("-p")),
            Some(password) => {
                let via_file = ArchiveFormat::from_path(input)
                    .is_some_and(ArchiveFormat::supports_password_file);

                validate_password(password, !via_file)?;

                if via_file {
                    args.push(Arg::PasswordFile(password.clone()));
                } else {
                    args.push(Arg::InlinePassword(password.clone()));
                }
            }
        }

        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{
        CompressionLevel, CompressionMethod, DictionarySize, SolidBlockSize, WordSize,
    };

    fn lit(s: &str) -> Arg {
        Arg::literal(s)
    }

    fn builder() -> CommandBuilder {
        CommandBuilder::default().with_max_threads(NonZeroUsize::new(8).unwrap())
    }

    #[test]
    fn compress_minimal() {
        let request = ArchiveRequest::compress(
            "/tmp/a.txt",
            "/tmp/a.7z",
            ArchiveOptions::default().with_password(""),
        );
        let command = builder().build(&request).unwrap();

        assert_eq!(command.program(), "7z");
        assert_eq!(
            command.args(),
            [
                lit("a"),
                lit("-t7z"),
                lit("-mx=5"),
                lit("/tmp/a.7z"),
                lit("/tmp/a.txt"),
            ]
        );
        assert_eq!(command.password_file_secret(), None);
    }

    #[test]
    fn compress_every_level() {
        let codes = ["0", "1", "3", "5", "7", "9"];

        for (level, code) in CompressionLevel::ALL.into_iter().zip(codes) {
            let options = ArchiveOptions {
                format: ArchiveFormat::Zip,
                level,
                ..Default::default()
            };
            let command = builder()
                .build(&ArchiveRequest::compress("in", "out.zip", options))
                .unwrap();

            assert_eq!(command.args()[1], lit("-tzip"));
            assert_eq!(command.args()[2], lit(&format!("-mx={code}")));
            assert_eq!(command.args().len(), 5);
        }
    }

    #[test]
    fn compress_all_options() {
        let options = ArchiveOptions {
            format: ArchiveFormat::SevenZip,
            level: CompressionLevel::Ultra,
            method: Some(CompressionMethod::Lzma2),
            dictionary_size: Some(DictionarySize::Mib64),
            word_size: Some(WordSize::try_from(256).unwrap()),
            solid_block_size: Some(SolidBlockSize::NonSolid),
            threads: NonZeroUsize::new(4),
            password: None,
            encrypt_file_names: true,
        }
        .with_password("hunter2");
        let command = builder()
            .build(&ArchiveRequest::compress("dir", "out.7z", options))
            .unwrap();

        assert_eq!(
            command.args(),
            [
                lit("a"),
                lit("-t7z"),
                lit("-mx=9"),
                lit("-m0=LZMA2"),
                lit("-md=64m"),
                lit("-mfb=256"),
                lit("-ms=off"),
                lit("-mmt=4"),
                lit("-mhe=on"),
                Arg::InlinePassword("hunter2".into()),
                lit("out.7z"),
                lit("dir"),
            ]
        );

        let rendered = command.render(None).unwrap();
        assert_eq!(rendered[9], OsString::from("-phunter2"));
        assert!(!format!("{command:?}").contains("hunter2"));
    }

    #[test]
    fn compress_zip_method_switch() {
        let options = ArchiveOptions {
            format: ArchiveFormat::Zip,
            method: Some(CompressionMethod::Ppmd),
            ..Default::default()
        };
        let command = builder()
            .build(&ArchiveRequest::compress("in", "out.zip", options))
            .unwrap();
        assert_eq!(command.args()[3], lit("-mm=PPMd"));
    }

    #[test]
    fn compress_rejects_unsupported_combinations() {
        let cases = [
            ArchiveOptions {
                format: ArchiveFormat::Zip,
                method: Some(CompressionMethod::Lzma2),
                ..Default::default()
            },
            ArchiveOptions {
                format: ArchiveFormat::Zip,
                solid_block_size: Some(SolidBlockSize::Mib(2)),
                ..Default::default()
            },
            ArchiveOptions {
                format: ArchiveFormat::Tar,
                ..Default::default()
            }
            .with_password("secret"),
            ArchiveOptions {
                format: ArchiveFormat::Gzip,
                dictionary_size: Some(DictionarySize::Mib1),
                ..Default::default()
            },
            ArchiveOptions {
                encrypt_file_names: true,
                ..Default::default()
            },
            ArchiveOptions {
                threads: NonZeroUsize::new(9),
                ..Default::default()
            },
        ];

        for options in cases {
            let result = builder().build(&ArchiveRequest::compress("in", "out", options));
            assert!(
                matches!(result, Err(Error::InvalidOptions(_))),
                "{result:?}"
            );
        }
    }

    #[test]
    fn compress_rejects_unlisted_solid_block_sizes() {
        for mib in [0, 3, 1536] {
            let options = ArchiveOptions {
                solid_block_size: Some(SolidBlockSize::Mib(mib)),
                ..Default::default()
            };
            let result = builder().build(&ArchiveRequest::compress("in", "out.7z", options));
            assert!(matches!(result, Err(Error::InvalidOptions(_))), "{mib}");
        }

        let options = ArchiveOptions {
            solid_block_size: Some(SolidBlockSize::Mib(2048)),
            ..Default::default()
        };
        let command = builder()
            .build(&ArchiveRequest::compress("in", "out.7z", options))
            .unwrap();
        assert_eq!(command.args()[3], lit("-ms=2g"));
    }

    #[test]
    fn compress_rejects_dangerous_passwords() {
        for password in ["line\nbreak", "nul\0byte", "@/etc/shadow", "tab\there"] {
            let options = ArchiveOptions::default().with_password(password);
            let result = builder().build(&ArchiveRequest::compress("in", "out.7z", options));
            assert!(matches!(result, Err(Error::InvalidOptions(_))), "{password:?}");
        }

        // Spaces and shell metacharacters are harmless without a shell.
        let options = ArchiveOptions::default().with_password("a b;$(c)");
        assert!(builder()
            .build(&ArchiveRequest::compress("in", "out.7z", options))
            .is_ok());
    }

    #[test]
    fn rejects_empty_paths() {
        let result = builder().build(&ArchiveRequest::compress("", "out.7z", Default::default()));
        assert!(matches!(result, Err(Error::InvalidOptions(_))));

        let result = builder().build(&ArchiveRequest::extract("a.7z", "", Default::default()));
        assert!(matches!(result, Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn rejects_paths_that_look_like_switches() {
        let requests = [
            ArchiveRequest::compress("/home/u/docs", "-sdel", Default::default()),
            ArchiveRequest::compress("-r", "out.7z", Default::default()),
            ArchiveRequest::extract("-ai.zip", "/tmp/out", Default::default()),
            ArchiveRequest::extract("a.zip", "-y", Default::default()),
        ];

        for request in requests {
            let result = builder().build(&request);
            assert!(matches!(result, Err(Error::InvalidOptions(_))), "{request:?}");
        }

        // Only a leading dash matters.
        assert!(builder()
            .build(&ArchiveRequest::compress("./-r", "out-1.7z", Default::default()))
            .is_ok());
    }

    #[test]
    fn extract_without_password() {
        let command = builder()
            .build(&ArchiveRequest::extract(
                "/tmp/a.7z",
                "/tmp/out",
                ArchiveOptions::default(),
            ))
            .unwrap();

        assert_eq!(
            command.args(),
            [
                lit("x"),
                lit("/tmp/a.7z"),
                lit("-o/tmp/out"),
                lit("-y"),
                lit("-p"),
            ]
        );
    }

    #[test]
    fn extract_password_uses_file_for_7z_and_zip() {
        for input in ["/tmp/a.zip", "/tmp/a.7z", "/tmp/A.ZIP"] {
            let options = ArchiveOptions::default().with_password("secret");
            let command = builder()
                .build(&ArchiveRequest::extract(input, "/tmp/out", options))
                .unwrap();

            assert_eq!(command.args().len(), 5);
            assert_eq!(command.args()[4], Arg::PasswordFile("secret".into()));
            assert_eq!(command.password_file_secret(), Some("secret"));

            let rendered = command.render(Some(Path::new("/run/pw"))).unwrap();
            assert_eq!(rendered[4], OsString::from("-p@/run/pw"));
            assert!(rendered.iter().all(|a| a != "-psecret"));

            assert!(command.render(None).is_err());
        }
    }

    #[test]
    fn extract_password_inline_for_other_formats() {
        for input in ["/tmp/a.rar", "/tmp/a.tar", "/tmp/a.tar.gz", "/tmp/a.xz"] {
            let options = ArchiveOptions::default().with_password("secret");
            let command = builder()
                .build(&ArchiveRequest::extract(input, "/tmp/out", options))
                .unwrap();

            assert_eq!(command.args()[4], Arg::InlinePassword("secret".into()));
            assert_eq!(command.password_file_secret(), None);
        }
    }

    #[test]
    fn extract_at_sign_only_allowed_via_file() {
        let options = ArchiveOptions::default().with_password("@home");
        assert!(builder()
            .build(&ArchiveRequest::extract("a.7z", "out", options.clone()))
            .is_ok());
        assert!(matches!(
            builder().build(&ArchiveRequest::extract("a.rar", "out", options)),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn extract_rejects_unknown_extension() {
        for input in ["/tmp/a.txt", "/tmp/noext"] {
            let result = builder().build(&ArchiveRequest::extract(
                input,
                "/tmp/out",
                Default::default(),
            ));
            assert!(matches!(result, Err(Error::InvalidOptions(_))), "{input}");
        }
    }

    #[test]
    fn paths_stay_single_arguments() {
        let command = builder()
            .build(&ArchiveRequest::compress(
                "/tmp/my file; rm -rf ~",
                "/tmp/out $(x).7z",
                Default::default(),
            ))
            .unwrap();

        assert_eq!(command.args()[3], lit("/tmp/out $(x).7z"));
        assert_eq!(command.args()[4], lit("/tmp/my file; rm -rf ~"));
    }
}
