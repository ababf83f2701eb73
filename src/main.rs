use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use kdbx_reader::{
    CompressionFlag, DecodeOptions, Element, FramingPolicy, HeaderMetadata, KdbxDecoder, MasterKey,
    TerminatorPolicy,
};
use zeroize::Zeroizing;

#[derive(Parser, Debug)]
#[command(about = "Decrypt and decode the body of a KDBX-style database")]
#[command(group(ArgGroup::new("master_key").required(true).args(["key", "key_file"])))]
struct Args {
    /// File holding the encrypted body (everything after the header block).
    body: PathBuf,

    /// Derived master key as 64 hex characters.
    #[arg(long)]
    key: Option<String>,

    /// File holding the master key, either 32 raw bytes or 64 hex characters.
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Encryption IV from the header, as hex.
    #[arg(long)]
    iv: String,

    /// Stream start bytes from the header, as hex.
    #[arg(long)]
    start_bytes: String,

    /// Compression declared in the header.
    #[arg(long, value_enum, default_value_t = Compression::Gzip)]
    compression: Compression,

    /// When the payload is treated as a hashed block stream.
    #[arg(long, value_enum, default_value_t = Framing::Always)]
    framing: Framing,

    /// Accept a block stream that ends without a terminator block.
    #[arg(long)]
    allow_missing_terminator: bool,

    /// Print an indented outline of element names.
    #[arg(long, conflicts_with = "raw")]
    outline: bool,

    /// Write the decompressed payload to stdout instead of a summary.
    #[arg(long)]
    raw: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Compression {
    None,
    Gzip,
}

impl From<Compression> for CompressionFlag {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => CompressionFlag::None,
            Compression::Gzip => CompressionFlag::Gzip,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Framing {
    Always,
    WhenCompressed,
}

impl From<Framing> for FramingPolicy {
    fn from(value: Framing) -> Self {
        match value {
            Framing::Always => FramingPolicy::AlwaysFramed,
            Framing::WhenCompressed => FramingPolicy::FramedWhenCompressed,
        }
    }
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
}

fn run(mut args: Args) -> Result<()> {
    let key = load_key(&mut args)?;
    let header = HeaderMetadata::new(
        parse_hex("--iv", &args.iv)?,
        parse_hex("--start-bytes", &args.start_bytes)?,
        args.compression.into(),
    );
    let terminator = if args.allow_missing_terminator {
        TerminatorPolicy::Optional
    } else {
        TerminatorPolicy::Required
    };
    let options = DecodeOptions::new()
        .with_framing(args.framing.into())
        .with_terminator(terminator);

    let source = File::open(&args.body)
        .with_context(|| format!("failed to open {}", args.body.display()))?;
    let decoder = KdbxDecoder::new(source).with_options(options);

    if args.raw {
        let payload = decoder
            .decode_payload(&header, &key)
            .with_context(|| format!("failed to decode {}", args.body.display()))?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(&payload)?;
        stdout.flush()?;
        return Ok(());
    }

    println!("Decoding KDBX body: {}", args.body.display());
    println!("  Compression: {}", header.compression);
    println!("  Framing: {:?}", options.framing);
    println!("{}", "=".repeat(60));

    let content = decoder
        .decode(&header, &key)
        .with_context(|| format!("failed to decode {}", args.body.display()))?;

    println!("SUCCESS! Decoding completed.");
    println!("{}", "=".repeat(60));
    println!("\nContent:");
    println!("  Root element: <{}>", content.root().name);
    println!("  Total elements: {}", content.element_count());
    if let Some(generator) = content.find(&["Meta", "Generator"]) {
        println!("  Generator: {}", generator.text());
    }

    if args.outline {
        println!("\nOutline:");
        print_outline(content.root(), 1);
    }

    Ok(())
}

fn load_key(args: &mut Args) -> Result<MasterKey> {
    if let Some(hex_key) = args.key.take().map(Zeroizing::new) {
        return Ok(MasterKey::from(parse_secret_hex("--key", &hex_key)?));
    }
    match &args.key_file {
        Some(path) => read_key_file(path),
        None => bail!("either --key or --key-file is required"),
    }
}

fn read_key_file(path: &Path) -> Result<MasterKey> {
    let raw = Zeroizing::new(
        fs::read(path).with_context(|| format!("failed to read key file {}", path.display()))?,
    );
    if raw.len() == 32 {
        return Ok(MasterKey::from(raw));
    }
    let text = std::str::from_utf8(&raw)
        .with_context(|| format!("key file {} is neither 32 raw bytes nor hex", path.display()))?;
    Ok(MasterKey::from(parse_secret_hex("--key-file", text)?))
}

fn parse_secret_hex(arg: &str, value: &str) -> Result<Zeroizing<Vec<u8>>> {
    hex::decode(value.trim())
        .map(Zeroizing::new)
        .with_context(|| format!("{arg} is not valid hex"))
}

fn parse_hex(arg: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim()).with_context(|| format!("{arg} is not valid hex"))
}

fn print_outline(element: &Element, depth: usize) {
    let attributes = if element.attributes.is_empty() {
        String::new()
    } else {
        let names: Vec<&str> = element.attributes.iter().map(|(k, _)| k.as_str()).collect();
        format!(" [{}]", names.join(", "))
    };
    println!("{}{}{}", "  ".repeat(depth), element.name, attributes);
    for child in element.child_elements() {
        print_outline(child, depth + 1);
    }
}
