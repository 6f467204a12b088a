//! Decimal linear-algebra helpers for the optimizer.
//!
//! Small dense matrices only: rebalancing universes are tens of symbols,
//! so Gauss-Jordan inversion and Newton square roots in `Decimal` are
//! both fast enough and exactly reproducible across platforms.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ballast_core::error::ComputeError;

/// Dot product.
#[must_use]
pub fn vec_dot(a: &[Decimal], b: &[Decimal]) -> Decimal {
    a.iter().zip(b.iter()).map(|(x, y)| *x * *y).sum()
}

/// Matrix-vector multiplication.
#[must_use]
pub fn mat_vec(mat: &[Vec<Decimal>], v: &[Decimal]) -> Vec<Decimal> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Matrix inverse via Gauss-Jordan with partial pivoting.
///
/// # Errors
///
/// Returns `ComputeError::SingularMatrix` when a pivot underflows.
pub fn mat_inverse(mat: &[Vec<Decimal>]) -> Result<Vec<Vec<Decimal>>, ComputeError> {
    let n = mat.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut aug: Vec<Vec<Decimal>> = Vec::with_capacity(n);
    for (i, src) in mat.iter().enumerate() {
        let mut row = Vec::with_capacity(2 * n);
        row.extend_from_slice(src);
        for j in 0..n {
            row.push(if i == j { Decimal::ONE } else { Decimal::ZERO });
        }
        aug.push(row);
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < dec!(0.0000000001) {
            return Err(ComputeError::SingularMatrix);
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        let pivot = aug[col][col];
        for cell in &mut aug[col] {
            *cell /= pivot;
        }

        let pivot_row = aug[col].clone();
        for (row, row_vals) in aug.iter_mut().enumerate() {
            if row == col {
                continue;
            }
            let factor = row_vals[col];
            for (cell, &pv) in row_vals.iter_mut().zip(pivot_row.iter()) {
                *cell -= factor * pv;
            }
        }
    }

    Ok(aug.iter().map(|row| row[n..].to_vec()).collect())
}

/// Square root via Newton's method.
///
/// Non-positive inputs return zero (variances are clamped upstream).
#[must_use]
pub fn sqrt(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if value == Decimal::ONE {
        return Decimal::ONE;
    }
    let two = dec!(2);
    let mut guess = value / two;
    if guess.is_zero() {
        guess = dec!(0.0000001);
    }
    for _ in 0..24 {
        if guess.is_zero() {
            return Decimal::ZERO;
        }
        guess = (guess + value / guess) / two;
    }
    guess
}

/// Arithmetic mean. Empty input yields zero.
#[must_use]
pub fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len())
}

/// Equal weights over `n` assets.
#[must_use]
pub fn equal_weights(n: usize) -> Vec<Decimal> {
    if n == 0 {
        return Vec::new();
    }
    vec![Decimal::ONE / Decimal::from(n); n]
}

/// Scales weights so they sum to 1. A zero-sum vector is left unchanged.
pub fn normalize(w: &mut [Decimal]) {
    let total: Decimal = w.iter().sum();
    if !total.is_zero() {
        for wi in w.iter_mut() {
            *wi /= total;
        }
    }
}

/// Clamps each weight into `[0, cap]`.
pub fn clamp_box(w: &mut [Decimal], cap: Decimal) {
    for wi in w.iter_mut() {
        if *wi < Decimal::ZERO {
            *wi = Decimal::ZERO;
        } else if *wi > cap {
            *wi = cap;
        }
    }
}

/// Portfolio standard deviation: sqrt(w' * Sigma * w).
#[must_use]
pub fn portfolio_std(w: &[Decimal], sigma: &[Vec<Decimal>]) -> Decimal {
    let sigma_w = mat_vec(sigma, w);
    sqrt(vec_dot(w, &sigma_w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_converges() {
        assert!((sqrt(dec!(4)) - dec!(2)).abs() < dec!(0.0001));
        assert!((sqrt(dec!(2)) - dec!(1.4142)).abs() < dec!(0.001));
        assert_eq!(sqrt(dec!(-1)), Decimal::ZERO);
        assert_eq!(sqrt(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_identity_inverse() {
        let eye = vec![
            vec![dec!(1), dec!(0)],
            vec![dec!(0), dec!(1)],
        ];
        let inv = mat_inverse(&eye).unwrap();
        assert_eq!(inv, eye);
    }

    #[test]
    fn test_inverse_two_by_two() {
        // [[2, 0], [0, 4]] inverts to [[0.5, 0], [0, 0.25]]
        let mat = vec![
            vec![dec!(2), dec!(0)],
            vec![dec!(0), dec!(4)],
        ];
        let inv = mat_inverse(&mat).unwrap();
        assert_eq!(inv[0][0], dec!(0.5));
        assert_eq!(inv[1][1], dec!(0.25));
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let mat = vec![
            vec![dec!(1), dec!(2)],
            vec![dec!(2), dec!(4)],
        ];
        assert_eq!(mat_inverse(&mat), Err(ComputeError::SingularMatrix));
    }

    #[test]
    fn test_normalize_and_clamp() {
        let mut w = vec![dec!(3), dec!(1)];
        normalize(&mut w);
        assert_eq!(w, vec![dec!(0.75), dec!(0.25)]);

        clamp_box(&mut w, dec!(0.5));
        assert_eq!(w, vec![dec!(0.5), dec!(0.25)]);
    }

    #[test]
    fn test_portfolio_std_diagonal() {
        // Two uncorrelated assets at 4% variance each, 50/50.
        let sigma = vec![
            vec![dec!(0.04), dec!(0)],
            vec![dec!(0), dec!(0.04)],
        ];
        let w = vec![dec!(0.5), dec!(0.5)];
        // var = 0.25*0.04*2 = 0.02, std ~ 0.1414
        let std = portfolio_std(&w, &sigma);
        assert!((std - dec!(0.141421)).abs() < dec!(0.0001));
    }
}
