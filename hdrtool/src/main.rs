// SPDX-License-Identifier: MIT

mod config;
mod image;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use hdrfs::prelude::SectorId;
use log::LevelFilter;
use std::path::PathBuf;

use crate::config::{DiskArgs, DiskConfig};
use crate::image::{Image, read_data};
use crate::utils::pretty_bytes;

#[derive(Parser)]
#[command(
    name = "hdrtool",
    version,
    about = "File header tool for raw sector images",
    long_about = None
)]
struct Cli {
    /// Raise log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    disk: DiskArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a zeroed image with an empty free map
    Format {
        /// Image path
        image: PathBuf,
    },
    /// Allocate a file and write its header
    Create {
        /// Image path
        image: PathBuf,

        /// File length in bytes (defaults to the length of --data)
        #[arg(short, long)]
        size: Option<u32>,

        /// Sector for the header (first free sector otherwise)
        #[arg(long)]
        header: Option<SectorId>,

        /// Host file copied into the new file
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Print a file header and its contents
    Dump {
        /// Image path
        image: PathBuf,

        /// Sector holding the header
        #[arg(long)]
        header: SectorId,
    },
    /// Free a file and its header sector
    Remove {
        /// Image path
        image: PathBuf,

        /// Sector holding the header
        #[arg(long)]
        header: SectorId,
    },
    /// Show free map usage
    Stat {
        /// Image path
        image: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = DiskConfig::resolve(&cli.disk)?;

    match cli.command {
        Commands::Format { image } => {
            Image::format(&image, &config)?;
            println!(
                "{} {} ({} sectors of {} bytes, free map at sector {})",
                "Formatted".green().bold(),
                image.display(),
                config.sectors,
                config.sector_size,
                config.free_map_sector
            );
        }
        Commands::Create {
            image,
            size,
            header,
            data,
        } => {
            let data = match &data {
                Some(path) => read_data(path)?,
                None => Vec::new(),
            };
            let Some(size) = size.or_else(|| u32::try_from(data.len()).ok().filter(|&n| n > 0))
            else {
                anyhow::bail!("Give a file length with --size or a host file with --data");
            };
            let created = Image::open(&image, &config)?.create_file(size, header, &data)?;
            println!(
                "{} {} byte file, header at sector {} ({})",
                "Created".green().bold(),
                created.num_bytes,
                created.header_sector.to_string().cyan(),
                created.tier
            );
        }
        Commands::Dump { image, header } => {
            let dump = Image::open(&image, &config)?.dump(header)?;
            print!("{dump}");
        }
        Commands::Remove { image, header } => {
            let freed = Image::open(&image, &config)?.remove_file(header)?;
            println!(
                "{} header at sector {header}, {freed} sector(s) released",
                "Removed".yellow().bold()
            );
        }
        Commands::Stat { image } => {
            let usage = Image::open(&image, &config)?.usage()?;
            println!("{}", image.display().to_string().bold());
            println!(
                "  sectors   {} x {} bytes ({})",
                usage.sectors,
                usage.sector_size,
                pretty_bytes(usage.sectors as u64 * usage.sector_size as u64)
            );
            println!("  used      {}", usage.used.to_string().red());
            println!(
                "  free      {} ({})",
                usage.free.to_string().green(),
                pretty_bytes(usage.free as u64 * usage.sector_size as u64)
            );
            println!("  max file  {}", pretty_bytes(usage.max_file_size));
        }
    }

    Ok(())
}
