use glam::{DMat3, DVec3};

use crate::error::XtalError;

/// Crystallographic unit cell.
///
/// Orthogonalisation follows the PDB convention: `a` along x, `b` in the
/// xy-plane, `c` completing a right-handed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    dim: DVec3,
    angles: DVec3,
    reciprocal_dim: DVec3,
    reciprocal_angles: DVec3,
    volume: f64,
    /// Fractional → orthogonal (columns are the cell vectors).
    orth: DMat3,
    /// Orthogonal → fractional.
    frac: DMat3,
}

impl Cell {
    /// Build a cell from edge lengths (Å) and angles (degrees).
    ///
    /// # Errors
    ///
    /// [`XtalError::Configuration`] if a length is not positive and finite
    /// or the angles do not describe a cell with positive volume.
    pub fn new(lengths: [f64; 3], angles_deg: [f64; 3]) -> Result<Self, XtalError> {
        if lengths.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(XtalError::Configuration(format!(
                "cell lengths must be positive, got {lengths:?}"
            )));
        }
        let [a, b, c] = lengths;
        let angles = DVec3::new(
            angles_deg[0].to_radians(),
            angles_deg[1].to_radians(),
            angles_deg[2].to_radians(),
        );
        let (ca, cb, cg) = (angles.x.cos(), angles.y.cos(), angles.z.cos());
        let (sa, sb, sg) = (angles.x.sin(), angles.y.sin(), angles.z.sin());

        let metric = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
        if !metric.is_finite() || metric <= 1e-12 || sg <= 0.0 {
            return Err(XtalError::Configuration(format!(
                "cell angles {angles_deg:?} do not form a valid cell"
            )));
        }
        let volume = a * b * c * metric.sqrt();

        let v_a = DVec3::new(a, 0.0, 0.0);
        let v_b = DVec3::new(b * cg, b * sg, 0.0);
        let cx = c * cb;
        let cy = c * (ca - cb * cg) / sg;
        let cz = volume / (a * b * sg);
        let v_c = DVec3::new(cx, cy, cz);

        let orth = DMat3::from_cols(v_a, v_b, v_c);
        let frac = orth.inverse();

        let reciprocal_dim =
            DVec3::new(b * c * sa, a * c * sb, a * b * sg) / volume;
        let reciprocal_angles = DVec3::new(
            ((cb * cg - ca) / (sb * sg)).acos(),
            ((ca * cg - cb) / (sa * sg)).acos(),
            ((ca * cb - cg) / (sa * sb)).acos(),
        );

        Ok(Self {
            dim: DVec3::from_array(lengths),
            angles,
            reciprocal_dim,
            reciprocal_angles,
            volume,
            orth,
            frac,
        })
    }

    /// Edge lengths `(a, b, c)` in Å.
    #[must_use]
    pub fn dim(&self) -> DVec3 {
        self.dim
    }

    /// Cell angles `(α, β, γ)` in radians.
    #[must_use]
    pub fn angles(&self) -> DVec3 {
        self.angles
    }

    /// Cell angles `(α, β, γ)` in degrees.
    #[must_use]
    pub fn angles_deg(&self) -> DVec3 {
        DVec3::new(
            self.angles.x.to_degrees(),
            self.angles.y.to_degrees(),
            self.angles.z.to_degrees(),
        )
    }

    /// Reciprocal edge lengths `(a*, b*, c*)` in 1/Å.
    #[must_use]
    pub fn reciprocal_dim(&self) -> DVec3 {
        self.reciprocal_dim
    }

    /// Reciprocal angles `(α*, β*, γ*)` in radians.
    #[must_use]
    pub fn reciprocal_angles(&self) -> DVec3 {
        self.reciprocal_angles
    }

    /// Cell volume in Å³.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Fractional → orthogonal matrix.
    #[must_use]
    pub fn orth_matrix(&self) -> DMat3 {
        self.orth
    }

    /// Orthogonal → fractional matrix.
    #[must_use]
    pub fn frac_matrix(&self) -> DMat3 {
        self.frac
    }

    /// Whether all three angles are 90°.
    #[must_use]
    pub fn is_orthogonal(&self) -> bool {
        self.angles_deg()
            .to_array()
            .iter()
            .all(|a| (a - 90.0).abs() < 1e-9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthogonal_cell_matrices_are_diagonal() {
        let cell = Cell::new([50.0, 60.0, 70.0], [90.0, 90.0, 90.0]).unwrap();
        let m = cell.orth_matrix();
        assert!((m.x_axis - DVec3::new(50.0, 0.0, 0.0)).length() < 1e-9);
        assert!((m.y_axis - DVec3::new(0.0, 60.0, 0.0)).length() < 1e-9);
        assert!((m.z_axis - DVec3::new(0.0, 0.0, 70.0)).length() < 1e-9);
        assert!((cell.volume() - 210_000.0).abs() < 1e-6);
        assert!(cell.is_orthogonal());
    }

    #[test]
    fn monoclinic_cell_round_trips_and_has_reciprocal_metric() {
        let cell = Cell::new([40.0, 50.0, 60.0], [90.0, 105.0, 90.0]).unwrap();
        assert!(!cell.is_orthogonal());
        let p = DVec3::new(3.0, -7.5, 12.25);
        let back = cell.orth_matrix() * (cell.frac_matrix() * p);
        assert!((back - p).length() < 1e-9);
        // b* = 1/b for a monoclinic (unique b) cell.
        assert!((cell.reciprocal_dim().y - 1.0 / 50.0).abs() < 1e-12);
        // β* = 180° - β.
        assert!((cell.reciprocal_angles().y.to_degrees() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_degenerate_cells() {
        assert!(Cell::new([0.0, 10.0, 10.0], [90.0, 90.0, 90.0]).is_err());
        assert!(Cell::new([10.0, 10.0, 10.0], [60.0, 60.0, 150.0]).is_err());
        assert!(Cell::new([10.0, f64::NAN, 10.0], [90.0, 90.0, 90.0]).is_err());
    }
}
