mod errors;
mod formats;
mod utils;

use std::error::Error;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::errors::UnpackError;
use crate::formats::{bootimg, vendor_bootimg, UnpackedImage};
use crate::utils::common;

/// Unpacks Android boot and vendor boot images
#[derive(Parser, Debug)]
struct Args {
    /// Path to the boot image
    #[arg(long)]
    boot_img: PathBuf,

    /// Output directory for the extracted images
    #[arg(short = 'o', long = "out", visible_alias = "output", default_value = "out")]
    out: PathBuf,

    /// What to print after unpacking
    #[arg(long, value_enum, default_value = "info")]
    format: OutputFormat,

    /// Separate mkbootimg arguments with null bytes instead of spaces
    #[arg(short = '0', long)]
    null: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    /// Human readable header summary
    Info,
    /// Arguments for re-packing with mkbootimg
    Mkbootimg,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let mut file = File::open(&args.boot_img)
        .map_err(|e| format!("Failed to open boot image {}: {}", args.boot_img.display(), e))?;

    let magic = common::read_file(&file, 0, 8)
        .map_err(|_| UnpackError::truncated("boot magic"))?;

    let image = if magic == bootimg::BOOT_MAGIC {
        UnpackedImage::Boot(bootimg::unpack_boot_image(&mut file, &args.out)?)
    } else if magic == vendor_bootimg::VENDOR_BOOT_MAGIC {
        UnpackedImage::VendorBoot(vendor_bootimg::unpack_vendor_boot_image(&mut file, &args.out)?)
    } else {
        return Err(UnpackError::UnrecognizedFormat(magic).into());
    };

    match args.format {
        OutputFormat::Info => print!("{}", image),
        OutputFormat::Mkbootimg => print_mkbootimg_args(&image.mkbootimg_arguments(), args.null)?,
    }

    Ok(())
}

// null mode emits a NUL after every argument with no quoting and no trailing
// newline, for consumption via xargs -0
fn print_mkbootimg_args(args: &[String], null_separated: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if null_separated {
        for arg in args {
            out.write_all(arg.as_bytes())?;
            out.write_all(b"\0")?;
        }
        out.flush()?;
    } else {
        for arg in args {
            if arg.contains(' ') {
                write!(out, "'{}' ", arg)?;
            } else {
                write!(out, "{} ", arg)?;
            }
        }
        writeln!(out)?;
    }

    Ok(())
}
