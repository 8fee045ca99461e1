use clap::{Parser, Subcommand};
use std::path::PathBuf;

use jicex::cursor::ByteCursor;
use jicex::extract::{extract, sections, ExtractOptions};
use jicex::format::{tag_label, ContainerKind, ObjectTag};
use jicex::section::SectionKind;
use jicex::{ChecksumState, Scheme};

#[derive(Parser)]
#[command(name = "jicex", about = "Firmware extractor for Altera/Intel FPGA configuration containers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the firmware image from a .jic/.pof/.sof container as .rpd
    Extract {
        input: PathBuf,
        /// Output path (default: input with an .rpd extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Container format: jic (default), pof, sof
        #[arg(short, long, default_value = "jic")]
        format: String,
        /// Scheme for compressed sections: zstd (default), lz4, lzma
        #[arg(long, default_value = "zstd")]
        scheme: String,
        /// Pad the image with 0xFF to a multiple of this many bytes
        #[arg(long)]
        pad_to: Option<usize>,
        /// Index of the firmware section to extract when several are present
        #[arg(long, default_value = "0")]
        bitstream: usize,
        /// Abort after this many chain records (loop guard)
        #[arg(long, default_value = "4096")]
        max_chain: usize,
        /// Treat a checksum mismatch as a hard error instead of a warning
        #[arg(long)]
        require_checksum: bool,
        /// Match only the leader magic, ignoring its version fields
        #[arg(short, long)]
        nonstrict: bool,
    },
    /// List the container's section chain
    List {
        input: PathBuf,
        /// Container format: jic (default), pof, sof
        #[arg(short, long, default_value = "jic")]
        format: String,
        /// Emit the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show container identity and metadata
    Info {
        input: PathBuf,
        /// Container format: jic (default), pof, sof
        #[arg(short, long, default_value = "jic")]
        format: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match Cli::parse().command {

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract {
            input, output, format, scheme, pad_to, bitstream,
            max_chain, require_checksum, nonstrict,
        } => {
            let opts = ExtractOptions {
                kind:             parse_kind(&format),
                scheme:           parse_scheme(&scheme),
                pad_to,
                bitstream_index:  bitstream,
                max_chain_len:    max_chain,
                require_checksum,
                strict:           !nonstrict,
                ..ExtractOptions::default()
            };

            let container = std::fs::read(&input)?;
            let image = extract(&container, &opts)?;

            if let ChecksumState::Mismatch { stored, computed } = image.checksum {
                eprintln!("warning: firmware checksum mismatch (stored {stored:08x}, computed {computed:08x})");
            }

            let output = output.unwrap_or_else(|| input.with_extension("rpd"));
            std::fs::write(&output, image.as_bytes())?;
            println!("Extracted: {} ({} B image, {} B pad)",
                output.display(), image.logical_len, image.padding());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, format, json } => {
            let container = std::fs::read(&input)?;
            let opts = ExtractOptions {
                kind:   parse_kind(&format),
                strict: false,
                ..ExtractOptions::default()
            };
            let secs = sections(&container, &opts)?;

            if json {
                let report: Vec<_> = secs.iter().enumerate()
                    .map(|(i, s)| serde_json::json!({
                        "index":  i,
                        "kind":   s.kind,
                        "label":  tag_label(s.record.tag),
                        "record": s.record,
                        "value":  s.metadata_str(),
                    }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Container: {} ({} record(s))", input.display(), secs.len());
                println!("{:>3} {:>10} {:>5}  {:<12} {:>9} {:>9} {:>5}  Value",
                         "Idx", "Offset", "Tag", "Kind", "Stored", "Orig", "Comp");
                for (i, s) in secs.iter().enumerate() {
                    println!("{:>3} {:>#10x} {:>5}  {:<12} {:>9} {:>9} {:>5}  {}",
                        i, s.record.offset, s.record.tag, s.kind.name(),
                        s.record.data_len, s.record.orig_len,
                        if s.record.is_compressed() { "yes" } else { "no" },
                        s.metadata_str().unwrap_or("—"));
                }
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, format } => {
            let container = std::fs::read(&input)?;
            let leader = ObjectTag::read(&mut ByteCursor::new(&container))?;

            println!("── Configuration container ──────────────────────────────");
            println!("  Path          {}", input.display());
            println!("  Leader        {}", leader.hexdump());
            println!("  Magic         {}", leader.magic_str());
            println!("  Class         {}", leader.classify().map(|c| c.name()).unwrap_or("unknown"));

            let opts = ExtractOptions {
                kind:   parse_kind(&format),
                strict: false,
                ..ExtractOptions::default()
            };
            let secs = sections(&container, &opts)?;
            println!("  Records       {}", secs.len());

            for s in &secs {
                if let Some(value) = s.metadata_str() {
                    println!("  {:<13} {}", tag_label(s.record.tag).unwrap_or("metadata"), value);
                }
            }

            let firmware: Vec<_> = secs.iter().filter(|s| s.kind == SectionKind::Bitstream).collect();
            let stored:   u64 = firmware.iter().map(|s| s.record.data_len as u64).sum();
            let declared: u64 = firmware.iter().map(|s| s.record.orig_len as u64).sum();
            println!("  Firmware      {} section(s), {} B stored, {} B declared",
                firmware.len(), stored, declared);

            for s in secs.iter().filter(|s| s.kind == SectionKind::Unknown && !s.data.is_empty()) {
                let preview = &s.data[..s.data.len().min(12)];
                println!("  Tag {:<9} {} B  {}{}",
                    s.record.tag, s.record.data_len, hex::encode(preview),
                    if s.data.len() > preview.len() { "…" } else { "" });
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_kind(s: &str) -> ContainerKind {
    ContainerKind::from_name(s).unwrap_or_else(|| {
        eprintln!("Unknown format '{}', defaulting to jic", s);
        ContainerKind::Jic
    })
}

fn parse_scheme(s: &str) -> Scheme {
    Scheme::from_name(s).unwrap_or_else(|| {
        eprintln!("Unknown scheme '{}', defaulting to zstd", s);
        Scheme::Zstd
    })
}
