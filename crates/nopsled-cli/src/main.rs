mod output;
mod profile;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use nopsled_core::sled::{
    strip_hex_prefix, verify_sled, ByteSet, SledConstraints, SledGenerator, SledRequest,
};
use nopsled_core::table::{
    default_table, single_byte_table, TransitionTable, DEFAULT_SINGLE_BYTE_OPCODES,
};
use nopsled_core::x86::{check_fallthrough, disassemble};

use output::{render, OutputFormat};
use profile::Profile;

/// Environment variable naming the table used when none is given.
const TABLE_ENV: &str = "NOPSLED_TABLE";

#[derive(Parser, Debug)]
#[command(name = "nopsled", version, about = "Polymorphic x86 NOP sled generator")]
struct Cli {
    /// Increase log detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a sled
    Generate(GenerateArgs),
    /// Check a raw sled file against a table and constraints
    Verify {
        /// Raw sled file
        input: PathBuf,
        /// Register the sled must not modify (repeatable or comma separated)
        #[arg(short, long = "save", value_delimiter = ',')]
        save: Vec<String>,
        /// Forbidden bytes
        #[arg(short, long)]
        badchars: Option<String>,
        /// Transition table (JSON)
        #[arg(short, long)]
        table: Option<PathBuf>,
    },
    /// Write a single-byte transition table as JSON
    ExportTable {
        /// Output JSON path
        #[arg(short, long)]
        output: PathBuf,
        /// Opcodes to include (hex list, built-in set if not specified)
        #[arg(long)]
        opcodes: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
struct GenerateArgs {
    /// Sled length in bytes (zero or negative gives an empty sled)
    #[arg(short, long, allow_negative_numbers = true)]
    length: Option<i64>,
    /// Register the sled must not modify (repeatable or comma separated)
    #[arg(short, long = "save", value_delimiter = ',')]
    save: Vec<String>,
    /// Forbidden bytes, e.g. '\x00\x0a' or 000a
    #[arg(short, long)]
    badchars: Option<String>,
    /// Transition table (JSON, relative to the current directory); defaults
    /// to $NOPSLED_TABLE, then the built-in single-byte table
    #[arg(short, long)]
    table: Option<PathBuf>,
    /// RNG seed (hex, random if not specified)
    #[arg(long)]
    seed: Option<String>,
    /// Output format (default: raw for files, hex for stdout)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the disassembly from offset 0
    #[arg(long)]
    disasm: bool,
    /// TOML profile supplying defaults for the options above
    #[arg(short, long)]
    profile: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Generate(args) => cmd_generate(args),
        Command::Verify {
            input,
            save,
            badchars,
            table,
        } => cmd_verify(&input, save, badchars, table),
        Command::ExportTable { output, opcodes } => {
            cmd_export_table(&output, opcodes.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// `generate` options after merging flags over the profile.
#[derive(Debug, PartialEq)]
struct GenerateOptions {
    length: i64,
    save: Vec<String>,
    badchars: String,
    table: Option<PathBuf>,
    seed: Option<String>,
    format: OutputFormat,
    output: Option<PathBuf>,
    disasm: bool,
}

impl GenerateOptions {
    /// Flags win; the profile fills in whatever the command line left out.
    fn merge(flags: GenerateArgs, profile: Profile) -> Result<Self> {
        let Some(length) = flags.length.or(profile.length) else {
            bail!("no sled length given (use --length or a profile)");
        };
        let save = if flags.save.is_empty() {
            profile.save_registers
        } else {
            flags.save
        };
        let format = flags.format.or(profile.format).unwrap_or(if flags.output.is_some() {
            OutputFormat::Raw
        } else {
            OutputFormat::Hex
        });

        Ok(GenerateOptions {
            length,
            save,
            badchars: flags.badchars.or(profile.badchars).unwrap_or_default(),
            table: flags.table.or(profile.table),
            seed: flags.seed.or(profile.seed),
            format,
            output: flags.output,
            disasm: flags.disasm,
        })
    }
}

fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let profile = match &args.profile {
        Some(path) => {
            info!("loading profile {}", path.display());
            Profile::load(path)?
        }
        None => Profile::default(),
    };
    let options = GenerateOptions::merge(args, profile)?;
    debug!("generate options: {options:?}");

    let request = SledRequest {
        length: options.length,
        save_registers: options.save,
        badchars: options.badchars,
    };
    let constraints = request.constraints()?;
    let table = load_table(options.table)?;
    let seed = parse_seed(options.seed.as_deref())?;

    eprintln!("[*] Length: {} bytes", request.normalized_length());
    eprintln!("[*] Preserved registers: {}", constraints.preserve);
    eprintln!("[*] Forbidden bytes: {}", constraints.forbidden.len());
    eprintln!("[*] Seed: 0x{seed:016X}");

    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let (sled, stats) = SledGenerator::new(&table)
        .generate_with_stats(request.normalized_length(), &constraints, &mut rng)
        .context("sled generation failed")?;
    eprintln!(
        "[+] Sled: {} bytes, {} distinct values, per-value usage {}..={}",
        stats.length, stats.distinct_bytes, stats.min_usage, stats.max_usage
    );

    if options.disasm {
        for insn in disassemble(&sled, 0) {
            let bytes: String = sled[insn.offset..insn.offset + insn.len]
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect();
            eprintln!("    {:04x}  {:<8} {}", insn.offset, bytes, insn.text);
        }
    }

    let rendered = render(&sled, options.format);
    match options.output {
        Some(path) => {
            fs::write(&path, &rendered)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            eprintln!("[+] Written: {}", path.display());
        }
        None => io::stdout().write_all(&rendered)?,
    }
    Ok(())
}

fn cmd_verify(
    input: &Path,
    save: Vec<String>,
    badchars: Option<String>,
    table: Option<PathBuf>,
) -> Result<()> {
    let sled = fs::read(input).with_context(|| format!("failed to read '{}'", input.display()))?;
    let request = SledRequest {
        length: 0,
        save_registers: save,
        badchars: badchars.unwrap_or_default(),
    };
    let constraints = request.constraints()?;
    let table = load_table(table)?;

    check_sled(&table, &sled, &constraints)
        .with_context(|| format!("'{}' is not a valid sled", input.display()))?;
    eprintln!("[+] OK: {} bytes", sled.len());
    Ok(())
}

/// Table transitions first, then a decode from every entry offset.
fn check_sled(table: &TransitionTable, sled: &[u8], constraints: &SledConstraints) -> Result<()> {
    verify_sled(table, sled, constraints)?;
    check_fallthrough(sled).context("decode check failed")?;
    Ok(())
}

fn cmd_export_table(output: &Path, opcodes: Option<&str>) -> Result<()> {
    let table = match opcodes {
        Some(text) => {
            let opcodes: Vec<u8> = ByteSet::parse(text)?.iter().collect();
            single_byte_table(&opcodes)?
        }
        None => default_table()?,
    };
    fs::write(output, table.to_json()?)
        .with_context(|| format!("failed to write '{}'", output.display()))?;
    eprintln!("[+] Table written: {}", output.display());
    Ok(())
}

/// Load the table from `path`, then `$NOPSLED_TABLE`, then the built-in set.
fn load_table(path: Option<PathBuf>) -> Result<TransitionTable> {
    let path = path.or_else(|| std::env::var_os(TABLE_ENV).map(PathBuf::from));
    match path {
        Some(path) => {
            let table = TransitionTable::load(&path)
                .with_context(|| format!("failed to load table '{}'", path.display()))?;
            eprintln!("[*] Table: {}", path.display());
            Ok(table)
        }
        None => {
            eprintln!(
                "[*] Table: built-in single-byte ({} opcodes)",
                DEFAULT_SINGLE_BYTE_OPCODES.len()
            );
            Ok(default_table()?)
        }
    }
}

fn parse_seed(seed: Option<&str>) -> Result<u64> {
    match seed {
        Some(s) => u64::from_str_radix(strip_hex_prefix(s.trim()), 16)
            .with_context(|| format!("invalid hex seed '{s}'")),
        None => Ok(rand::random()),
    }
}
