use clap::Parser;
use std::collections::BTreeSet;

use crate::zip::{CrcPolicy, DEFAULT_PREVIEW_LEN, ExtractionRequest, ReaderConfig};

#[derive(Parser, Debug)]
#[command(name = "memzip")]
#[command(version)]
#[command(about = "List and extract ZIP archives with CRC-32 verification", long_about = None)]
#[command(after_help = "Examples:\n  \
  memzip data1.zip -d out           extract all files of data1.zip into out/\n  \
  memzip -p foo.zip '*/README'      print the first README found in any directory\n  \
  memzip -v https://example.com/archive.zip   list files of a remote ZIP")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Files to extract (default: all); with -p, the entry to print
    #[arg(value_name = "NAMES")]
    pub names: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely, with sizes, dates and CRC status
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Print a single entry to stdout, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR", default_value = ".")]
    pub extract_dir: String,

    /// Overwrite existing files
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Write entries even when their CRC-32 does not match
    #[arg(long = "write-corrupt")]
    pub write_corrupt: bool,

    /// Bytes of content shown per entry in verbose listings
    #[arg(long = "preview", value_name = "BYTES", default_value_t = DEFAULT_PREVIEW_LEN)]
    pub preview: usize,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.is_very_quiet() {
            "error"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    pub fn reader_config(&self) -> ReaderConfig {
        let crc_policy = if self.write_corrupt {
            CrcPolicy::WriteAndFlag
        } else {
            CrcPolicy::SuppressWrite
        };
        ReaderConfig::default()
            .with_preview_len(self.preview)
            .with_crc_policy(crc_policy)
    }

    /// Translate the flags into an extraction request.
    ///
    /// Listing flags win over everything else; `-p` takes the first name as
    /// selector; otherwise names become the extraction filter.
    pub fn request(&self) -> ExtractionRequest {
        let name_filter = (!self.names.is_empty())
            .then(|| self.names.iter().cloned().collect::<BTreeSet<_>>());

        let destination = if self.list || self.verbose {
            None
        } else if self.pipe {
            Some(self.names.first().cloned().unwrap_or_default())
        } else {
            Some(self.extract_dir.clone())
        };

        ExtractionRequest::from_flags(destination, self.pipe, self.overwrite, name_filter)
    }
}
