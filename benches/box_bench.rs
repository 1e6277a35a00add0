#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use viso_xtal::boxes::{box_for_sphere, grid_padding};
use viso_xtal::crystal::{Cell, GridSampling, OrthCoord, Spacegroup, UnitCell};
use viso_xtal::options::SymmetryOptions;
use viso_xtal::symmetry::{
    find_close_points_sets, Atom, AtomicModel, ModelKind, ModelStore, SymmetryExpansionEngine,
};

fn monoclinic() -> (Cell, GridSampling) {
    let cell = Cell::new([48.0, 36.0, 52.0], [90.0, 104.0, 90.0]).unwrap();
    let grid = GridSampling::from_resolution(&cell, 2.0, 1.5).unwrap();
    (cell, grid)
}

fn random_points(rng: &mut StdRng, n: usize, extent: f64) -> Vec<DVec3> {
    (0..n)
        .map(|_| {
            DVec3::new(
                rng.random_range(0.0..extent),
                rng.random_range(0.0..extent),
                rng.random_range(0.0..extent),
            )
        })
        .collect()
}

fn box_geometry_benchmark(c: &mut Criterion) {
    let (cell, grid) = monoclinic();
    c.bench_function("grid_padding", |b| {
        b.iter(|| black_box(grid_padding(black_box(20.0), &cell, &grid)))
    });
    c.bench_function("box_for_sphere", |b| {
        b.iter(|| {
            black_box(box_for_sphere(
                black_box(OrthCoord::new(13.2, 7.9, 21.4)),
                20.0,
                3,
                &cell,
                &grid,
            ))
        })
    });
}

fn proximity_benchmark(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let sets: Vec<Vec<DVec3>> = (0..24).map(|_| random_points(&mut rng, 2000, 80.0)).collect();
    let search: Vec<&[DVec3]> = sets.iter().map(Vec::as_slice).collect();
    let target = [DVec3::splat(40.0)];
    c.bench_function("find_close_points_sets_24x2000", |b| {
        b.iter(|| black_box(find_close_points_sets(&search, &target, 20.0)))
    });
}

fn symmetry_update_benchmark(c: &mut Criterion) {
    let (cell, grid) = monoclinic();
    let mut rng = StdRng::seed_from_u64(5);
    let mut model = AtomicModel::new();
    for (i, chunk) in random_points(&mut rng, 1200, 24.0).chunks(8).enumerate() {
        let atoms = chunk
            .iter()
            .map(|&p| Atom::new("C", "C", p + DVec3::splat(4.0)))
            .collect();
        let _ = model.add_residue("GLY", "A", i as i32 + 1, atoms);
    }
    let coords = model.coords();
    let mut store = ModelStore::new();
    let reference = store.add("reference", ModelKind::Atomic(model));
    let sg = Spacegroup::from_name("P 1 21 1").unwrap();
    let provider = UnitCell::new(sg, cell, grid, &coords).unwrap();
    let mut engine =
        SymmetryExpansionEngine::new(provider, cell, grid, reference, SymmetryOptions::default());

    let center = OrthCoord::new(30.0, 20.0, 30.0);
    // Warm the copy cache so the loop measures steady-state updates.
    let _ = engine.update(&mut store, center, 20.0, true).unwrap();
    c.bench_function("symmetry_update_warm", |b| {
        b.iter(|| black_box(engine.update(&mut store, black_box(center), 20.0, true).unwrap()))
    });
}

criterion_group!(
    benches,
    box_geometry_benchmark,
    proximity_benchmark,
    symmetry_update_benchmark
);
criterion_main!(benches);
