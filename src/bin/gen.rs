//! geoasn-gen: build DN42 ASN MMDB databases from a registry checkout.

use clap::{Parser, Subcommand};
use geoasn::builder::MmdbWriter;
use geoasn::converter::{CsvSource, RegistryScanner};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "geoasn-gen")]
#[command(version)]
#[command(about = "Build DN42 ASN MMDB databases from registry data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract route objects from a registry checkout into CSV
    Collect {
        /// Registry root (containing data/route, data/route6, data/aut-num)
        #[arg(short, long)]
        registry: PathBuf,

        /// Output CSV file
        #[arg(short, long, default_value = "dn42_asn.csv")]
        output: PathBuf,
    },

    /// Build an MMDB database from CSV
    Build {
        /// Input CSV file (network,asn,organization)
        #[arg(short, long, default_value = "dn42_asn.csv")]
        input: PathBuf,

        /// Output MMDB file
        #[arg(short, long, default_value = "GeoLite2-ASN-DN42.mmdb")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Collect { registry, output } => collect(&registry, &output),
        Commands::Build { input, output } => build(&input, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn collect(registry: &Path, output: &Path) -> geoasn::Result<()> {
    let scan = RegistryScanner::new(registry).scan()?;

    let mut out = BufWriter::new(File::create(output)?);
    CsvSource::write(&scan.records, &mut out)?;
    out.flush()?;

    println!(
        "Wrote {} networks to {:?} ({} without AS name, {} invalid)",
        scan.records.len(),
        output,
        scan.unnamed,
        scan.invalid
    );
    Ok(())
}

fn build(input: &Path, output: &Path) -> geoasn::Result<()> {
    let records = CsvSource::parse(BufReader::new(File::open(input)?))?;

    let mut writer = MmdbWriter::new();
    writer.extend(&records);
    let data = writer.write()?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output, &data)?;

    println!(
        "Wrote {} networks to {:?} ({} bytes)",
        records.len(),
        output,
        data.len()
    );
    Ok(())
}
