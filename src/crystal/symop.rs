//! Symmetry operators in fractional space.
//!
//! An operator is an integer rotation plus a translation stored in units of
//! 1/[`TRANSLATION_DENOMINATOR`], which makes equality and hashing exact so
//! operators can key caches.

use std::fmt;
use std::str::FromStr;

use glam::{DAffine3, DMat3, DVec3, IVec3};

use super::cell::Cell;
use super::coords::FracCoord;
use crate::error::XtalError;

/// Translations are multiples of 1/24 of a cell edge (covers 1/2, 1/3,
/// 1/4, 1/6 and 1/8 components).
pub const TRANSLATION_DENOMINATOR: i32 = 24;

/// Affine fractional-space transform `x' = R·x + t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymmetryOperator {
    /// Row-major integer rotation.
    rot: [[i32; 3]; 3],
    /// Translation in 1/24ths.
    trn: [i32; 3],
}

impl SymmetryOperator {
    /// The identity operator.
    pub const IDENTITY: Self = Self {
        rot: [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
        trn: [0, 0, 0],
    };

    /// Operator from a row-major rotation and a fractional translation.
    /// The translation is snapped to the nearest 1/24.
    #[must_use]
    pub fn new(rot: [[i32; 3]; 3], translation: [f64; 3]) -> Self {
        let d = f64::from(TRANSLATION_DENOMINATOR);
        Self {
            rot,
            trn: translation.map(|t| (t * d).round() as i32),
        }
    }

    /// Whether this is the identity (no rotation, no translation).
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Rotation part as a matrix acting on fractional column vectors.
    #[must_use]
    pub fn rotation(&self) -> DMat3 {
        let r = |i: usize, j: usize| f64::from(self.rot[i][j]);
        DMat3::from_cols(
            DVec3::new(r(0, 0), r(1, 0), r(2, 0)),
            DVec3::new(r(0, 1), r(1, 1), r(2, 1)),
            DVec3::new(r(0, 2), r(1, 2), r(2, 2)),
        )
    }

    /// Translation part in fractional units.
    #[must_use]
    pub fn translation(&self) -> DVec3 {
        IVec3::from_array(self.trn).as_dvec3()
            / f64::from(TRANSLATION_DENOMINATOR)
    }

    /// Apply to a fractional coordinate.
    #[must_use]
    pub fn apply(&self, f: FracCoord) -> FracCoord {
        FracCoord(self.rotation() * f.0 + self.translation())
    }

    /// The same operator followed by a whole-cell lattice translation.
    #[must_use]
    pub fn with_lattice_shift(&self, shift: IVec3) -> Self {
        let d = TRANSLATION_DENOMINATOR;
        Self {
            rot: self.rot,
            trn: [
                self.trn[0] + shift.x * d,
                self.trn[1] + shift.y * d,
                self.trn[2] + shift.z * d,
            ],
        }
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        let mut rot = [[0; 3]; 3];
        let mut trn = self.trn;
        for (i, row) in rot.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.rot[i][k] * other.rot[k][j]).sum();
            }
            trn[i] += (0..3).map(|k| self.rot[i][k] * other.trn[k]).sum::<i32>();
        }
        Self { rot, trn }
    }

    /// Real-space transform for `cell`: `orth · (R·frac·x + t)`.
    #[must_use]
    pub fn to_orth(&self, cell: &Cell) -> DAffine3 {
        let m = cell.orth_matrix() * self.rotation() * cell.frac_matrix();
        let t = cell.orth_matrix() * self.translation();
        DAffine3::from_mat3_translation(m, t)
    }

    /// Parse crystallographic xyz-triplet notation such as `-x+1/2,y,-z`.
    ///
    /// # Errors
    ///
    /// [`XtalError::SymopParse`] on malformed input, a non-integer rotation
    /// or a singular rotation.
    pub fn parse(s: &str) -> Result<Self, XtalError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 {
            return Err(XtalError::SymopParse(format!(
                "expected three comma-separated components in '{s}'"
            )));
        }
        let mut rot = [[0; 3]; 3];
        let mut trn = [0.0; 3];
        for (i, part) in parts.iter().enumerate() {
            let (row, t) = parse_component(part)
                .map_err(|msg| XtalError::SymopParse(format!("'{s}': {msg}")))?;
            rot[i] = row;
            trn[i] = t;
        }
        let op = Self::new(rot, trn);
        if op.rotation().determinant().abs() < 0.5 {
            return Err(XtalError::SymopParse(format!(
                "'{s}' has a singular rotation"
            )));
        }
        Ok(op)
    }
}

impl Default for SymmetryOperator {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FromStr for SymmetryOperator {
    type Err = XtalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse one row of a triplet, e.g. `-x+y+1/3`.
fn parse_component(part: &str) -> Result<([i32; 3], f64), String> {
    let chars: Vec<char> = part.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return Err("empty component".to_owned());
    }
    let mut row = [0; 3];
    let mut trn = 0.0;
    let mut i = 0;
    while i < chars.len() {
        let mut sign = 1.0;
        if chars[i] == '+' || chars[i] == '-' {
            if chars[i] == '-' {
                sign = -1.0;
            }
            i += 1;
        }
        let Some(&c) = chars.get(i) else {
            return Err("dangling sign".to_owned());
        };
        if let Some(axis) = axis_index(c) {
            row[axis] += sign as i32;
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
            i += 1;
        }
        if start == i {
            return Err(format!("unexpected character '{c}'"));
        }
        let numer: f64 = chars[start..i]
            .iter()
            .collect::<String>()
            .parse()
            .map_err(|_| "bad number".to_owned())?;
        let mut value = numer;
        if chars.get(i) == Some(&'/') {
            i += 1;
            let dstart = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let denom: f64 = chars[dstart..i]
                .iter()
                .collect::<String>()
                .parse()
                .map_err(|_| "bad denominator".to_owned())?;
            if denom == 0.0 {
                return Err("zero denominator".to_owned());
            }
            value /= denom;
        }
        // A coefficient directly followed by an axis, e.g. "2x".
        if let Some(axis) = chars.get(i).copied().and_then(axis_index) {
            if value.fract() != 0.0 {
                return Err("non-integer rotation coefficient".to_owned());
            }
            row[axis] += (sign * value) as i32;
            i += 1;
        } else {
            trn += sign * value;
        }
    }
    Ok((row, trn))
}

fn axis_index(c: char) -> Option<usize> {
    match c.to_ascii_lowercase() {
        'x' => Some(0),
        'y' => Some(1),
        'z' => Some(2),
        _ => None,
    }
}

fn gcd(a: i32, b: i32) -> i32 {
    if b == 0 {
        a.abs()
    } else {
        gcd(b, a % b)
    }
}

impl fmt::Display for SymmetryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const AXES: [char; 3] = ['x', 'y', 'z'];
        for (i, row) in self.rot.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            let mut term = String::new();
            for (axis, &c) in AXES.iter().zip(row) {
                match c {
                    0 => {}
                    1 => term.push_str(&format!("+{axis}")),
                    -1 => term.push_str(&format!("-{axis}")),
                    _ => term.push_str(&format!("{c:+}{axis}")),
                }
            }
            let t = self.trn[i];
            if t != 0 {
                let g = gcd(t, TRANSLATION_DENOMINATOR);
                let (n, d) = (t / g, TRANSLATION_DENOMINATOR / g);
                if d == 1 {
                    term.push_str(&format!("{n:+}"));
                } else {
                    term.push_str(&format!("{n:+}/{d}"));
                }
            }
            let term = term.strip_prefix('+').unwrap_or(term.as_str());
            if term.is_empty() {
                write!(f, "0")?;
            } else {
                write!(f, "{term}")?;
            }
        }
        Ok(())
    }
}
