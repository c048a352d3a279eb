//! A small dense-matrix type with LU-based inversion, hand-rolled rather
//! than pulling in a linear-algebra crate, in the same spirit as the
//! hand-rolled Kahan summation and streaming moments in
//! [`crate::stats::statistics`]. Used for Hessian inversion in the
//! minimiser and for the covariance/correlation matrices shared by the
//! minimiser and the MCMC proposal machinery.

#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Matrix::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let nrows = rows.len();
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(nrows * ncols);
        for row in &rows {
            assert_eq!(row.len(), ncols, "ragged matrix rows");
            data.extend_from_slice(row);
        }
        Matrix {
            rows: nrows,
            cols: ncols,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }

    /// Symmetric within `tol` of its transpose.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        if self.rows != self.cols {
            return false;
        }
        for i in 0..self.rows {
            for j in (i + 1)..self.cols {
                if (self.get(i, j) - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Zero rows (and their matching columns) pinned to the identity
    /// before inversion, guaranteeing invertibility.
    pub fn pin_zero_rows_to_identity(&mut self) {
        assert_eq!(self.rows, self.cols);
        for i in 0..self.rows {
            let row_is_zero = (0..self.cols).all(|j| self.get(i, j) == 0.0);
            if row_is_zero {
                self.set(i, i, 1.0);
            }
        }
    }

    /// Inverts a square matrix via LU decomposition with partial pivoting.
    /// Returns `None` if the matrix is numerically singular.
    pub fn inverse(&self) -> Option<Matrix> {
        assert_eq!(self.rows, self.cols, "inverse requires a square matrix");
        let n = self.rows;
        let (lu, pivot) = lu_decompose(self)?;

        let mut inv = Matrix::zeros(n, n);
        for col in 0..n {
            let mut rhs = vec![0.0; n];
            rhs[col] = 1.0;
            let solved = lu_solve(&lu, &pivot, &rhs);
            for row in 0..n {
                inv.set(row, col, solved[row]);
            }
        }
        Some(inv)
    }

    /// The correlation matrix derived from a covariance matrix: each entry
    /// divided by the product of the corresponding diagonal standard
    /// deviations, leaving a unit diagonal.
    pub fn to_correlation(&self) -> Matrix {
        assert_eq!(self.rows, self.cols);
        let n = self.rows;
        let std_devs: Vec<f64> = (0..n).map(|i| self.get(i, i).max(0.0).sqrt()).collect();
        let mut corr = Matrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                let denom = std_devs[i] * std_devs[j];
                let value = if denom > 0.0 {
                    self.get(i, j) / denom
                } else if i == j {
                    1.0
                } else {
                    0.0
                };
                corr.set(i, j, value);
            }
        }
        corr
    }

    pub fn scale_rows_cols(&self, factors: &[f64]) -> Matrix {
        assert_eq!(self.rows, self.cols);
        assert_eq!(factors.len(), self.rows);
        let mut out = self.clone();
        for i in 0..self.rows {
            for j in 0..self.cols {
                let v = self.get(i, j) * factors[i] * factors[j];
                out.set(i, j, if v.is_nan() { 0.0 } else { v });
            }
        }
        out
    }

    /// Lower-triangular Cholesky factor `L` such that `L * L^T == self`,
    /// used to draw correlated multivariate-normal proposals.
    pub fn cholesky(&self) -> Option<Matrix> {
        assert_eq!(self.rows, self.cols);
        let n = self.rows;
        let mut l = Matrix::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let mut sum = self.get(i, j);
                for k in 0..j {
                    sum -= l.get(i, k) * l.get(j, k);
                }
                if i == j {
                    if sum <= 0.0 {
                        return None;
                    }
                    l.set(i, j, sum.sqrt());
                } else {
                    l.set(i, j, sum / l.get(j, j));
                }
            }
        }
        Some(l)
    }

    pub fn mat_vec(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(self.cols, v.len());
        (0..self.rows)
            .map(|r| (0..self.cols).map(|c| self.get(r, c) * v[c]).sum())
            .collect()
    }
}

fn lu_decompose(m: &Matrix) -> Option<(Matrix, Vec<usize>)> {
    let n = m.rows;
    let mut lu = m.clone();
    let mut pivot: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let mut max_row = k;
        let mut max_val = lu.get(k, k).abs();
        for i in (k + 1)..n {
            let val = lu.get(i, k).abs();
            if val > max_val {
                max_val = val;
                max_row = i;
            }
        }

        if max_val < 1e-300 {
            return None;
        }

        if max_row != k {
            for c in 0..n {
                let tmp = lu.get(k, c);
                lu.set(k, c, lu.get(max_row, c));
                lu.set(max_row, c, tmp);
            }
            pivot.swap(k, max_row);
        }

        for i in (k + 1)..n {
            let factor = lu.get(i, k) / lu.get(k, k);
            lu.set(i, k, factor);
            for j in (k + 1)..n {
                let v = lu.get(i, j) - factor * lu.get(k, j);
                lu.set(i, j, v);
            }
        }
    }

    Some((lu, pivot))
}

fn lu_solve(lu: &Matrix, pivot: &[usize], rhs: &[f64]) -> Vec<f64> {
    let n = lu.rows;
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = rhs[pivot[i]];
        for j in 0..i {
            sum -= lu.get(i, j) * y[j];
        }
        y[i] = sum;
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= lu.get(i, j) * x[j];
        }
        x[i] = sum / lu.get(i, i);
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_inverts_to_itself() {
        let id = Matrix::identity(3);
        let inv = id.inverse().unwrap();
        assert_eq!(inv, id);
    }

    #[test]
    fn inverse_of_diagonal_matrix() {
        let m = Matrix::from_rows(vec![
            vec![2.0, 0.0, 0.0],
            vec![0.0, 4.0, 0.0],
            vec![0.0, 0.0, 0.5],
        ]);
        let inv = m.inverse().unwrap();
        assert!((inv.get(0, 0) - 0.5).abs() < 1e-12);
        assert!((inv.get(1, 1) - 0.25).abs() < 1e-12);
        assert!((inv.get(2, 2) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_matrix_has_unit_diagonal() {
        let cov = Matrix::from_rows(vec![vec![4.0, 2.0], vec![2.0, 9.0]]);
        let corr = cov.to_correlation();
        assert!((corr.get(0, 0) - 1.0).abs() < 1e-12);
        assert!((corr.get(1, 1) - 1.0).abs() < 1e-12);
        assert!((corr.get(0, 1) - (2.0 / (2.0 * 3.0))).abs() < 1e-12);
    }

    #[test]
    fn zero_rows_pinned_before_inversion() {
        let mut m = Matrix::from_rows(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0],
            vec![0.0, 0.0, 3.0],
        ]);
        m.pin_zero_rows_to_identity();
        let inv = m.inverse().unwrap();
        assert!((inv.get(1, 1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cholesky_reconstructs_covariance() {
        let cov = Matrix::from_rows(vec![vec![4.0, 2.0], vec![2.0, 9.0]]);
        let l = cov.cholesky().unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let sum: f64 = (0..2).map(|k| l.get(i, k) * l.get(j, k)).sum();
                assert!((sum - cov.get(i, j)).abs() < 1e-9);
            }
        }
    }
}
