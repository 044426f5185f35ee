use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use sigmaker::{load_image, parse_address};
use sigmaker_core::format::format_signature;
use sigmaker_core::model::SignatureFormat;
use sigmaker_core::services::synthesis::{
    self, GrowthDecision, GrowthPolicy, SynthesisOptions,
};
use sigmaker_core::services::xrefs;

/// Unique byte-signature generator CLI.
///
/// This CLI is a thin wrapper around `sigmaker-core` (exposed in code as
/// `sigmaker_core`). All substantive logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "sigmaker",
    version,
    about = "Unique byte-signature generator for native binaries",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a unique signature for a code address.
    ///
    /// Instructions are consumed starting at the address, operand bytes are
    /// wildcarded (unless disabled), and the pattern grows until it matches
    /// the image at exactly one location.
    Address {
        /// Path to the binary image.
        #[arg(long)]
        binary: PathBuf,

        /// Anchor address, hex. File offset for object files, absolute for
        /// raw images loaded with `--base`.
        #[arg(long)]
        address: String,

        /// Output encoding.
        #[arg(long, value_enum, default_value = "ida")]
        format: FormatArg,

        /// Match every instruction byte exactly instead of wildcarding
        /// operand bytes.
        #[arg(long, default_value_t = false)]
        no_wildcard: bool,

        /// Bytes the signature may grow before asking whether to continue.
        #[arg(long, default_value_t = 1000)]
        max_length: usize,

        /// Fail with an error instead of prompting when the growth guard is
        /// exceeded.
        #[arg(long, default_value_t = false)]
        non_interactive: bool,

        /// Architecture hint (e.g., x86_64, x86, arm, arm64). Overrides
        /// detection for object files; required meaningfully for raw images.
        #[arg(long)]
        arch: Option<String>,

        /// Treat the file as a flat code image instead of parsing it.
        #[arg(long, default_value_t = false)]
        raw: bool,

        /// Load base address for raw images, hex.
        #[arg(long, default_value = "0")]
        base: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Find the shortest unique signatures among the call/reference sites of
    /// a target address.
    ///
    /// Each incoming far reference is used as an alternative anchor; results
    /// are ranked ascending by signature length.
    Xref {
        /// Path to the binary image.
        #[arg(long)]
        binary: PathBuf,

        /// Target address the references point at, hex.
        #[arg(long)]
        address: String,

        /// Output encoding.
        #[arg(long, value_enum, default_value = "ida")]
        format: FormatArg,

        /// Match every instruction byte exactly instead of wildcarding
        /// operand bytes.
        #[arg(long, default_value_t = false)]
        no_wildcard: bool,

        /// Hard growth limit per reference site (no prompting on this path).
        #[arg(long, default_value_t = 250)]
        max_length: usize,

        /// How many of the shortest signatures to show.
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Architecture hint (e.g., x86_64, x86, arm, arm64).
        #[arg(long)]
        arch: Option<String>,

        /// Treat the file as a flat code image instead of parsing it.
        #[arg(long, default_value_t = false)]
        raw: bool,

        /// Load base address for raw images, hex.
        #[arg(long, default_value = "0")]
        base: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Emit the bytes of an address range as an all-fixed signature.
    ///
    /// No instruction or operand logic is involved; every byte in the range
    /// is matched exactly.
    Range {
        /// Path to the binary image.
        #[arg(long)]
        binary: PathBuf,

        /// Range start address, hex (inclusive).
        #[arg(long)]
        start: String,

        /// Range end address, hex (exclusive).
        #[arg(long)]
        end: String,

        /// Output encoding.
        #[arg(long, value_enum, default_value = "ida")]
        format: FormatArg,

        /// Architecture hint (e.g., x86_64, x86, arm, arm64).
        #[arg(long)]
        arch: Option<String>,

        /// Treat the file as a flat code image instead of parsing it.
        #[arg(long, default_value_t = false)]
        raw: bool,

        /// Load base address for raw images, hex.
        #[arg(long, default_value = "0")]
        base: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// CLI-facing names for the output encodings.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Ida,
    X64dbg,
    PatternMask,
    ByteArrayBitmask,
}

impl From<FormatArg> for SignatureFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Ida => SignatureFormat::Ida,
            FormatArg::X64dbg => SignatureFormat::X64Dbg,
            FormatArg::PatternMask => SignatureFormat::PatternMask,
            FormatArg::ByteArrayBitmask => SignatureFormat::ByteArrayBitmask,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Address {
            binary,
            address,
            format,
            no_wildcard,
            max_length,
            non_interactive,
            arch,
            raw,
            base,
            json,
        } => address_command(
            &binary,
            &address,
            format,
            no_wildcard,
            max_length,
            non_interactive,
            arch.as_deref(),
            raw,
            &base,
            json,
        )?,
        Command::Xref {
            binary,
            address,
            format,
            no_wildcard,
            max_length,
            top,
            arch,
            raw,
            base,
            json,
        } => xref_command(
            &binary,
            &address,
            format,
            no_wildcard,
            max_length,
            top,
            arch.as_deref(),
            raw,
            &base,
            json,
        )?,
        Command::Range { binary, start, end, format, arch, raw, base, json } => {
            range_command(&binary, &start, &end, format, arch.as_deref(), raw, &base, json)?
        }
    }

    Ok(())
}

/// Interactive growth guard: ask on stderr, read one line from stdin.
/// Anything other than yes/no aborts, mirroring a cancelled dialog.
struct StdinGrowthPrompt;

impl GrowthPolicy for StdinGrowthPrompt {
    fn on_limit(&mut self, signature_len: usize) -> GrowthDecision {
        eprint!("Signature is already at {signature_len} bytes. Continue growing? [y/n/c] ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return GrowthDecision::Abort;
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => GrowthDecision::Continue,
            "n" | "no" => GrowthDecision::Stop,
            _ => GrowthDecision::Abort,
        }
    }
}

/// Generate and print a signature for a single code address.
#[allow(clippy::too_many_arguments)]
fn address_command(
    binary: &std::path::Path,
    address: &str,
    format: FormatArg,
    no_wildcard: bool,
    max_length: usize,
    non_interactive: bool,
    arch: Option<&str>,
    raw: bool,
    base: &str,
    json: bool,
) -> Result<()> {
    let base = parse_address(base)?;
    let anchor = parse_address(address)?;
    let image = load_image(binary, raw, base, arch)?;

    let options = SynthesisOptions { wildcard_operands: !no_wildcard, max_length };
    let outcome = if non_interactive {
        synthesis::synthesize(&image, anchor, options, None)?
    } else {
        let mut prompt = StdinGrowthPrompt;
        synthesis::synthesize(&image, anchor, options, Some(&mut prompt))?
    };

    let rendered = format_signature(outcome.signature(), format.into());
    if json {
        let payload = serde_json::json!({
            "address": format!("{anchor:X}"),
            "unique": outcome.is_unique(),
            "signature": rendered,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if outcome.is_unique() {
        println!("Signature for {anchor:X}: {rendered}");
    } else {
        println!("NOT UNIQUE Signature for {anchor:X}: {rendered}");
    }

    Ok(())
}

/// Rank the reference sites of a target by signature length and print the
/// shortest ones.
#[allow(clippy::too_many_arguments)]
fn xref_command(
    binary: &std::path::Path,
    address: &str,
    format: FormatArg,
    no_wildcard: bool,
    max_length: usize,
    top: usize,
    arch: Option<&str>,
    raw: bool,
    base: &str,
    json: bool,
) -> Result<()> {
    let base = parse_address(base)?;
    let target = parse_address(address)?;
    let image = load_image(binary, raw, base, arch)?;

    let collected = xrefs::collect_xref_signatures(&image, target, !no_wildcard, max_length);
    if collected.is_empty() {
        println!("No unique xref signatures found for {target:X}");
        return Ok(());
    }

    if json {
        let entries: Vec<_> = collected
            .top(top)
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "origin": format!("{:X}", entry.origin),
                    "signature": format_signature(&entry.signature, format.into()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        let shown = collected.top(top);
        println!(
            "Top {} signatures out of {} xrefs for {target:X}:",
            shown.len(),
            collected.len()
        );
        for (i, entry) in shown.iter().enumerate() {
            println!(
                "XREF signature #{} @ {:X}: {}",
                i + 1,
                entry.origin,
                format_signature(&entry.signature, format.into())
            );
        }
    }

    Ok(())
}

/// Print the bytes of a selected range as an all-fixed signature.
#[allow(clippy::too_many_arguments)]
fn range_command(
    binary: &std::path::Path,
    start: &str,
    end: &str,
    format: FormatArg,
    arch: Option<&str>,
    raw: bool,
    base: &str,
    json: bool,
) -> Result<()> {
    let base = parse_address(base)?;
    let start = parse_address(start)?;
    let end = parse_address(end)?;
    let image = load_image(binary, raw, base, arch)?;

    let signature = synthesis::raw_range_signature(&image, start, end)?;
    let rendered = format_signature(&signature, format.into());
    if json {
        let payload = serde_json::json!({
            "start": format!("{start:X}"),
            "end": format!("{end:X}"),
            "signature": rendered,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Code for {start:X}-{end:X}: {rendered}");
    }

    Ok(())
}
