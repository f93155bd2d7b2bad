//! Footprint decimator for sequential-print arrangement.
//!
//! Reads the slicer's object export file, decimates each object's
//! nozzle-height footprint with a configurable Douglas–Peucker
//! tolerance, and writes an import file of `<id> <x> <y>` reference
//! positions (the translation that grounds the decimated footprint at
//! the origin, shifted by the nozzle offset).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use seqprint_geometry::decimate::decimate_polygon;

/// Decimate exported object footprints for the arrangement solver.
#[derive(Parser)]
#[command(name = "seqprint-decimate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input file in the slicer export format.
    #[arg(short = 'i', default_value = "arrange_data_export.txt")]
    input: PathBuf,

    /// Output import file.
    #[arg(short = 'o', default_value = "arrange_data_import.txt")]
    output: PathBuf,

    /// Douglas–Peucker tolerance in slicer units.
    #[arg(short = 't', default_value_t = 400_000.0)]
    tolerance: f64,

    /// Nozzle X offset added to every written position, in slicer units.
    #[arg(short = 'x', default_value_t = 0.0)]
    x_nozzle: f64,

    /// Nozzle Y offset added to every written position, in slicer units.
    #[arg(short = 'y', default_value_t = 0.0)]
    y_nozzle: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let objects = seqprint::io::load_objects_from_file(&cli.input)
        .with_context(|| format!("cannot read export file {}", cli.input.display()))?;
    info!("loaded {} objects from {}", objects.len(), cli.input.display());

    let file = File::create(&cli.output)
        .with_context(|| format!("cannot create import file {}", cli.output.display()))?;
    let mut writer = BufWriter::new(file);

    let mut decimated_count = 0usize;
    for object in &objects {
        let Some(footprint) = object.footprint() else {
            continue;
        };
        let decimated = decimate_polygon(footprint, cli.tolerance, false);
        let bbox = decimated.bounding_box();
        let x = -bbox.min.x + cli.x_nozzle.round() as i64;
        let y = -bbox.min.y + cli.y_nozzle.round() as i64;
        writeln!(writer, "{} {} {}", object.id, x, y)?;
        info!(
            "object {}: {} -> {} vertices",
            object.id,
            footprint.len(),
            decimated.len()
        );
        decimated_count += 1;
    }
    writer.flush()?;

    println!(
        "Decimated {} footprints from {} into {}",
        decimated_count,
        cli.input.display(),
        cli.output.display()
    );
    Ok(())
}
