//! Headless demo: random-walks the center of rotation through a synthetic
//! P 1 21 1 crystal and logs what each frame changed.
//!
//! Usage: `viso-xtal [options.toml]`. Set `RUST_LOG=info` to see output.

use std::path::Path;

use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use viso_xtal::crystal::{Cell, OrthCoord, Spacegroup};
use viso_xtal::maps::{PeriodicMap, VolumeModel};
use viso_xtal::options::Options;
use viso_xtal::session::{CrystalId, Session};
use viso_xtal::symmetry::{Atom, AtomicModel};
use viso_xtal::XtalError;

const FRAMES: u64 = 120;

/// A short helix-like chain wound around (12, 12, 12) Å.
fn demo_model() -> AtomicModel {
    let mut model = AtomicModel::new();
    for i in 0..12 {
        let t = f64::from(i) * 100f64.to_radians();
        let ca = DVec3::new(12.0 + 2.3 * t.cos(), 12.0 + 2.3 * t.sin(), 6.0 + 1.5 * f64::from(i));
        let _ = model.add_residue(
            "ALA",
            "A",
            i + 1,
            vec![
                Atom::new("N", "N", ca - DVec3::new(0.0, 1.0, 0.5)),
                Atom::new("CA", "C", ca),
                Atom::new("C", "C", ca + DVec3::new(1.2, 0.0, 0.5)),
                Atom::new("CB", "C", ca + DVec3::new(0.0, 0.0, 1.5)),
            ],
        );
    }
    model
}

fn setup(options: Options) -> Result<(Session, CrystalId, VolumeModel), XtalError> {
    let mut session = Session::new(options);
    let reference = session.add_model("demo", demo_model());
    let cell = Cell::new([48.0, 36.0, 52.0], [90.0, 104.0, 90.0])?;
    let grid = session.grid_for(&cell, 2.0)?;
    let id = session.add_crystal(reference, Spacegroup::from_name("P 1 21 1")?, cell, grid)?;

    let dim = grid.dim().as_dvec3();
    let map = PeriodicMap::from_fn("2mFo-DFc", grid, |g| {
        let f = g.0.as_dvec3() / dim * std::f64::consts::TAU;
        f.x.cos() * (2.0 * f.y).sin() + (3.0 * f.z).cos()
    });
    let volume = VolumeModel::new("2mFo-DFc");
    let _ = session.add_map(id, "2mFo-DFc", false, Box::new(map), Box::new(volume.clone()))?;

    session.set_center(OrthCoord::new(12.0, 12.0, 14.0));
    session.initialize_live_scrolling(id)?;
    let _ = session.initialize_symmetry_display(id, None)?;
    Ok((session, id, volume))
}

fn run(options: Options) -> Result<(), XtalError> {
    let (mut session, id, volume) = setup(options)?;
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..FRAMES {
        let step = DVec3::new(
            rng.random_range(-1.5..1.5),
            rng.random_range(-1.5..1.5),
            rng.random_range(-1.5..1.5),
        );
        session.set_center(OrthCoord(session.center().0 + step));
        let report = session.new_frame();
        for (_, e) in &report.errors {
            log::warn!("frame {}: {e}", report.frame);
        }
        for (_, change) in &report.map_changes {
            log::debug!("frame {}: map box {change:?}", report.frame);
        }
        for (_, update) in &report.symmetry_updates {
            log::info!(
                "frame {}: {} operators, {} shown, {} hidden",
                report.frame,
                update.operators.len(),
                update.displayed.len(),
                update.hidden.len()
            );
        }
    }

    if let Some(crystal) = session.crystal(id) {
        log::info!(
            "{}: {} symmetry copies built, volume refilled {} times ({} reallocations)",
            crystal.name(),
            crystal.symmetry().cache().created_count(),
            volume.data_version(),
            volume.replacements()
        );
    }
    log::info!(
        "average frame cost {:.3} ms, {} over budget",
        session.timer().smoothed_ms(),
        session.timer().slow_ticks()
    );
    Ok(())
}

fn main() {
    env_logger::init();

    let options = match std::env::args().nth(1) {
        Some(path) => match Options::load(Path::new(&path)) {
            Ok(options) => options,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        None => Options::default(),
    };

    if let Err(e) = run(options) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
