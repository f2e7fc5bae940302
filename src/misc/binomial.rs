use nalgebra::RealField;

/// Binomial coefficients backed by a lazily grown Pascal triangle.
pub struct Binomial<T> {
    rows: Vec<Vec<T>>,
}

impl<T: RealField + Copy> Binomial<T> {
    pub fn new() -> Self {
        Self {
            rows: vec![vec![T::one()]],
        }
    }

    /// Returns the binomial coefficient of `n` and `k`.
    pub fn get(&mut self, n: usize, k: usize) -> T {
        if k > n {
            return T::zero();
        }

        while self.rows.len() <= n {
            let prev = &self.rows[self.rows.len() - 1];
            let mut row = Vec::with_capacity(prev.len() + 1);
            row.push(T::one());
            for w in prev.windows(2) {
                row.push(w[0] + w[1]);
            }
            row.push(T::one());
            self.rows.push(row);
        }

        self.rows[n][k]
    }
}

impl<T: RealField + Copy> Default for Binomial<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Binomial;

    #[test]
    fn pascal_triangle() {
        let mut binomial = Binomial::<f64>::new();
        assert_eq!(binomial.get(5, 0), 1.);
        assert_eq!(binomial.get(5, 1), 5.);
        assert_eq!(binomial.get(5, 2), 10.);
        assert_eq!(binomial.get(5, 3), 10.);
        assert_eq!(binomial.get(5, 5), 1.);
        assert_eq!(binomial.get(5, 6), 0.);
        assert_eq!(binomial.get(2, 1), 2.);
    }
}
