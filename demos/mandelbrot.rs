//! Renders the Mandelbrot set into a binary PPM image.
//!
//! Every rank computes its own band of rows, then the bands are appended to the output file in rank
//! order. Usage: `mandelbrot [OUTPUT] [WIDTH] [HEIGHT] [MAX_ITER]`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use mpi_facade::canvas::DistributedCanvas;
use mpi_facade::traits::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CENTER: (f64, f64) = (-0.5, 0.0);
const SPAN_REAL: f64 = 3.0;

struct Settings {
    output: PathBuf,
    width: usize,
    height: usize,
    max_iter: u32,
}

impl Settings {
    fn from_args() -> Settings {
        let mut args = std::env::args().skip(1);
        let output = args.next().map_or_else(|| PathBuf::from("mandelbrot.ppm"), PathBuf::from);
        let mut number = |default: usize| -> usize {
            args.next().and_then(|a| a.parse().ok()).unwrap_or(default)
        };
        let width = number(800);
        let height = number(600);
        let max_iter = number(255) as u32;
        Settings {
            output,
            width,
            height,
            max_iter,
        }
    }
}

fn escape_time(c_re: f64, c_im: f64, max_iter: u32) -> u32 {
    let (mut z_re, mut z_im) = (0.0f64, 0.0f64);
    for iter in 0..max_iter {
        let (re2, im2) = (z_re * z_re, z_im * z_im);
        if re2 + im2 > 4.0 {
            return iter;
        }
        z_im = 2.0 * z_re * z_im + c_im;
        z_re = re2 - im2 + c_re;
    }
    max_iter
}

fn grayscale(score: u32, max_iter: u32) -> u8 {
    let ratio = 255.0 / f64::from(max_iter.max(1));
    255 - (ratio * f64::from(score)).min(255.0) as u8
}

fn append(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    OpenOptions::new().create(true).append(true).open(path)?.write_all(bytes)
}

fn main() -> mpi_facade::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = Settings::from_args();
    let universe = mpi_facade::initialize()?;
    let world = universe.world();
    let size = world.size()?;
    let rank = world.rank()?;

    let mut canvas = DistributedCanvas::<_, u32>::new(world, settings.width, settings.height)?;
    let span_imag = SPAN_REAL * settings.height as f64 / settings.width as f64;
    let top_left = (CENTER.0 - SPAN_REAL / 2.0, CENTER.1 + span_imag / 2.0);

    for row in canvas.rows() {
        let c_im = top_left.1 - span_imag * row as f64 / settings.height as f64;
        for col in canvas.cols() {
            let c_re = top_left.0 + SPAN_REAL * col as f64 / settings.width as f64;
            if let Some(cell) = canvas.get_mut(row, col) {
                *cell = escape_time(c_re, c_im, settings.max_iter);
            }
        }
    }
    info!(rank, rows = ?canvas.rows(), "band computed");

    // rows that do not divide evenly among the ranks are not rendered
    let rendered_rows = canvas.partition().rows_per_rank() * size as usize;
    if rank == 0 {
        if settings.output.exists() {
            fs::remove_file(&settings.output)?;
        }
        let header = format!("P6 {} {} 255\n", settings.width, rendered_rows);
        append(&settings.output, header.as_bytes())?;
    }

    canvas.write_ordered(|band| {
        let pixels: Vec<u8> = band
            .iter()
            .flat_map(|&score| [grayscale(score, settings.max_iter); 3])
            .collect();
        append(&settings.output, &pixels)
    })?;

    if rank == 0 {
        println!(
            "Wrote {}x{} image to {}",
            settings.width,
            rendered_rows,
            settings.output.display()
        );
    }
    Ok(())
}
