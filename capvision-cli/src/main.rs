mod draw;
mod enroll;

use std::{env, path::Path, process::exit};

use anyhow::{bail, Context};
use capvision::{CapIdentifier, ReferenceDb};
use opencv::{
    imgcodecs::{self, IMREAD_COLOR},
    prelude::*,
};

fn main() -> anyhow::Result<()> {
    setup_logging();

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("identify") if args.len() == 4 || args.len() == 5 => {
            identify(Path::new(&args[2]), Path::new(&args[3]), args.get(4).map(Path::new))
        }
        Some("enroll") if args.len() == 4 => {
            enroll::enroll_directory(Path::new(&args[2]), Path::new(&args[3]))
        }
        _ => {
            eprintln!("usage: {} identify <refdb-dir> <photo> [annotated-out]", args[0]);
            eprintln!("       {} enroll <caps-dir> <refdb-dir>", args[0]);
            exit(2);
        }
    }
}

fn identify(refdb_dir: &Path, photo: &Path, annotated_out: Option<&Path>) -> anyhow::Result<()> {
    let refdb = ReferenceDb::load(refdb_dir)?;
    let identifier = CapIdentifier::new(refdb);

    let img = imgcodecs::imread(path_str(photo)?, IMREAD_COLOR)?;
    if img.empty() {
        bail!("failed to read image {}", photo.display());
    }

    let results = identifier.identify(&img)?;
    if results.is_empty() {
        log::info!("no caps found in {}", photo.display());
    }
    for m in &results {
        log::info!(
            "region ({}, {}, {}x{}): {} (score {:.2}, {} of {} descriptors matched)",
            m.region.x,
            m.region.y,
            m.region.width,
            m.region.height,
            m.identity.as_deref().unwrap_or("unknown"),
            m.success,
            m.match_count,
            m.candidate_descriptors,
        );
    }

    let (confident, uncertain) = identifier.classify(results);
    log::info!("{} confident, {} uncertain", confident.len(), uncertain.len());

    if let Some(out) = annotated_out {
        // Regions are in the coordinates of the shrunk working image, so the
        // annotation is drawn on the same shrink of the photo.
        let display = capvision::shrink_to_area(
            &img,
            identifier.config().max_area,
            identifier.config().shrink_factor,
        )?;
        let annotated = draw::annotate(&display, &confident, &uncertain)?;
        imgcodecs::imwrite_def(path_str(out)?, &annotated)?;
        log::info!("annotated image written to {}", out.display());
    }

    Ok(())
}

fn path_str(path: &Path) -> anyhow::Result<&str> {
    path.to_str()
        .with_context(|| format!("path {} is not valid unicode", path.display()))
}

fn setup_logging() {
    simple_log::quick!();
}
