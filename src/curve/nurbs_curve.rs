use nalgebra::allocator::Allocator;
use nalgebra::{
    Const, DMatrix, DVector, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, OVector,
    U1,
};

use crate::knot::KnotVector;
use crate::misc::{Binomial, FloatingPoint};

/// NURBS curve representation
/// By generics, it can be used for 2D or 3D curves with f32 or f64 scalar types
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "T: serde::Serialize, OPoint<T, D>: serde::Serialize",
        deserialize = "T: serde::Deserialize<'de>, OPoint<T, D>: serde::Deserialize<'de>"
    ))
)]
pub struct NurbsCurve<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// control points with homogeneous coordinates
    /// the last element of the vector is the `weight`
    control_points: Vec<OPoint<T, D>>,
    degree: usize,
    /// knot vector for the NURBS curve
    /// the length of the knot vector is equal to the `# of control points + degree + 1`
    knots: KnotVector<T>,
}

/// 2D NURBS curve alias
pub type NurbsCurve2D<T> = NurbsCurve<T, Const<3>>;

/// 3D NURBS curve alias
pub type NurbsCurve3D<T> = NurbsCurve<T, Const<4>>;

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    /// Create a new NURBS curve
    /// # Failures
    /// - if the number of control points is less than the degree
    /// - the number of knots is not equal to the number of control points + the degree + 1
    /// - the knots are decreasing somewhere
    ///
    /// # Example
    /// ```
    /// use nurbs_intersection::prelude::*;
    /// use nalgebra::Point3;
    ///
    /// let w = 1.; // weight for each control points
    /// let control_points: Vec<Point3<f64>> = vec![
    ///     Point3::new(50., 50., w),
    ///     Point3::new(30., 370., w),
    ///     Point3::new(180., 350., w),
    ///     Point3::new(150., 100., w),
    /// ];
    /// let knots = vec![0., 0., 0., 0., 1., 1., 1., 1.];
    /// let nurbs = NurbsCurve2D::try_new(3, control_points, knots);
    /// assert!(nurbs.is_ok());
    /// ```
    pub fn try_new(
        degree: usize,
        control_points: Vec<OPoint<T, D>>,
        knots: Vec<T>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            control_points.len() > degree,
            "Too few control points for curve"
        );
        anyhow::ensure!(
            knots.len() == control_points.len() + degree + 1,
            "Invalid number of knots, got {}, expected {}",
            knots.len(),
            control_points.len() + degree + 1
        );
        anyhow::ensure!(
            knots.windows(2).all(|w| w[0] <= w[1]),
            "Knots must be non-decreasing"
        );

        Ok(Self {
            degree,
            control_points,
            knots: KnotVector::new(knots),
        })
    }

    /// Create a degree 1 curve through the points.
    /// The parameter of each point is its normalized cumulative chord length.
    pub fn try_polyline(points: &[OPoint<T, DimNameDiff<D, U1>>]) -> anyhow::Result<Self> {
        anyhow::ensure!(points.len() >= 2, "Too few points for polyline");

        let mut lengths = vec![T::zero()];
        for w in points.windows(2) {
            let last = lengths[lengths.len() - 1];
            lengths.push(last + (&w[1] - &w[0]).norm());
        }
        let total = lengths[lengths.len() - 1];
        anyhow::ensure!(total > T::zero(), "Polyline has zero length");

        let knots = [
            vec![T::zero()],
            lengths.iter().map(|l| *l / total).collect(),
            vec![T::one()],
        ]
        .concat();

        let control_points: Vec<OPoint<T, D>> = points.iter().map(homogenize::<T, D>).collect();

        Self::try_new(1, control_points, knots)
    }

    /// Return the dehomogenized control points
    pub fn dehomogenized_control_points(&self) -> Vec<OPoint<T, DimNameDiff<D, U1>>> {
        self.control_points
            .iter()
            .filter_map(dehomogenize)
            .collect()
    }


    /// Evaluate the curve at a given parameter to get a dehomonogenized point
    pub fn point_at(&self, t: T) -> OPoint<T, DimNameDiff<D, U1>> {
        let p = self.point(t);
        dehomogenize(&p).unwrap_or_else(OPoint::origin)
    }

    /// Evaluate the curve at a given parameter to get a homogeneous point
    pub(crate) fn point(&self, t: T) -> OPoint<T, D> {
        let n = self.knots.len() - self.degree - 2;
        let knot_span_index = self.knots.find_knot_span_index(n, self.degree, t);
        let basis = self.knots.basis_functions(knot_span_index, t, self.degree);
        let mut position = OPoint::<T, D>::origin();
        for i in 0..=self.degree {
            position.coords +=
                &self.control_points[knot_span_index - self.degree + i].coords * basis[i];
        }
        position
    }

    /// Evaluate the rational derivatives at a given parameter,
    /// the first element being the point itself
    pub fn rational_derivatives(&self, u: T, derivs: usize) -> Vec<OVector<T, DimNameDiff<D, U1>>> {
        let ders = self.derivatives(u, derivs);
        let a_ders: Vec<_> = ders
            .iter()
            .map(|d| {
                OVector::<T, DimNameDiff<D, U1>>::from_iterator(d.iter().take(D::dim() - 1).cloned())
            })
            .collect();
        let w_ders: Vec<_> = ders.iter().map(|d| d[D::dim() - 1]).collect();

        let mut ck: Vec<OVector<T, DimNameDiff<D, U1>>> = vec![];
        let mut binom = Binomial::<T>::new();
        for k in 0..=derivs {
            let mut v = a_ders[k].clone();

            for i in 1..=k {
                let coef = binom.get(k, i) * w_ders[i];
                v -= &ck[k - i] * coef;
            }

            ck.push(v / w_ders[0]);
        }
        ck
    }

    /// Evaluate the homogeneous derivatives at a given parameter
    fn derivatives(&self, u: T, derivs: usize) -> Vec<OVector<T, D>> {
        let n = self.knots.len() - self.degree - 2;

        let du = derivs.min(self.degree);
        let mut derivatives = vec![OVector::<T, D>::zeros(); derivs + 1];

        let knot_span_index = self.knots.find_knot_span_index(n, self.degree, u);
        let nders = self
            .knots
            .derivative_basis_functions(knot_span_index, u, self.degree, du);
        for k in 0..=du {
            for j in 0..=self.degree {
                derivatives[k] +=
                    &self.control_points[knot_span_index - self.degree + j].coords * nders[k][j];
            }
        }

        derivatives
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &KnotVector<T> {
        &self.knots
    }

    pub fn control_points(&self) -> &Vec<OPoint<T, D>> {
        &self.control_points
    }

    pub fn knots_domain(&self) -> (T, T) {
        self.knots.domain(self.degree)
    }

    /// Try to create an interpolated NURBS curve passing through the points.
    /// Parameters are assigned by chord length and the knots by averaging them.
    ///
    /// # Example
    /// ```
    /// use nurbs_intersection::prelude::*;
    /// use nalgebra::Point3;
    /// use approx::assert_relative_eq;
    ///
    /// let points: Vec<Point3<f64>> = vec![
    ///     Point3::new(-1.0, -1.0, 0.),
    ///     Point3::new(1.0, -1.0, 0.),
    ///     Point3::new(1.0, 1.0, 0.),
    ///     Point3::new(-1.0, 1.0, 0.),
    ///     Point3::new(-1.0, 2.0, 0.),
    /// ];
    /// let curve = NurbsCurve3D::try_interpolate(&points, 3).unwrap();
    ///
    /// let (start, end) = curve.knots_domain();
    /// assert_relative_eq!(points[0], curve.point_at(start), epsilon = 1e-10);
    /// assert_relative_eq!(points[points.len() - 1], curve.point_at(end), epsilon = 1e-10);
    /// ```
    pub fn try_interpolate(
        points: &[OPoint<T, DimNameDiff<D, U1>>],
        degree: usize,
    ) -> anyhow::Result<Self> {
        let n = points.len();
        anyhow::ensure!(degree >= 1, "Degree must be at least 1");
        anyhow::ensure!(n >= degree + 1, "Too few points for interpolation");

        let mut us: Vec<T> = vec![T::zero()];
        for i in 1..n {
            let chord = (&points[i] - &points[i - 1]).norm();
            let last = us[i - 1];
            us.push(last + chord);
        }

        let max = us[us.len() - 1];
        anyhow::ensure!(max > T::zero(), "Points to interpolate are coincident");
        for u in us.iter_mut() {
            *u /= max;
        }

        let mut knots_start = vec![T::zero(); degree + 1];
        let fdegree = T::constant(degree as f64);
        for i in 1..(n - degree) {
            let mut weight_sums = T::zero();
            for j in 0..degree {
                weight_sums += us[i + j];
            }
            knots_start.push(weight_sums / fdegree);
        }

        let knots = KnotVector::new([knots_start, vec![T::one(); degree + 1]].concat());

        // build basis function coefficients matrix
        let last = n - 1;
        let ld = n - (degree + 1);
        let mut m_a = DMatrix::<T>::zeros(n, n);
        for (i, u) in us.iter().enumerate() {
            let knot_span_index = knots.find_knot_span_index(last, degree, *u);
            let basis = knots.basis_functions(knot_span_index, *u, degree);
            let ls = knot_span_index - degree;
            debug_assert!(ls <= ld);
            for (j, b) in basis.into_iter().enumerate() {
                m_a[(i, ls + j)] = b;
            }
        }

        let dim = D::dim() - 1;

        // solve Ax = b with LU decomposition
        let lu = m_a.lu();
        let mut m_x = DMatrix::<T>::zeros(n, dim);
        for i in 0..dim {
            let b = DVector::from_iterator(n, points.iter().map(|p| p.coords[i]));
            let xs = lu
                .solve(&b)
                .ok_or(anyhow::anyhow!("Failed to solve the interpolation system"))?;
            m_x.set_column(i, &xs);
        }

        let control_points = (0..n)
            .map(|i| {
                let row = m_x.row(i);
                let coords = row.iter().cloned().chain(std::iter::once(T::one()));
                OPoint::from(OVector::<T, D>::from_iterator(coords))
            })
            .collect();

        Ok(Self {
            degree,
            control_points,
            knots,
        })
    }
}

/// Dehomogenize a point, `None` for a zero weight
pub fn dehomogenize<T: FloatingPoint, D: DimName>(
    point: &OPoint<T, D>,
) -> Option<OPoint<T, DimNameDiff<D, U1>>>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let v = &point.coords;
    let idx = D::dim() - 1;
    let w = v[idx];
    if w != T::zero() {
        let coords =
            v.generic_view((0, 0), (<D as DimNameSub<U1>>::Output::name(), Const::<1>)) / w;
        Some(OPoint { coords })
    } else {
        None
    }
}

/// Lift a point to homogeneous coordinates with unit weight
pub fn homogenize<T: FloatingPoint, D: DimName>(point: &OPoint<T, DimNameDiff<D, U1>>) -> OPoint<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let coords = point.coords.iter().cloned().chain(std::iter::once(T::one()));
    OPoint::from(OVector::<T, D>::from_iterator(coords))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3, Point4, Vector3};

    use super::{NurbsCurve2D, NurbsCurve3D};

    /// Quarter circle of radius 1 as a rational quadratic
    fn quarter_circle() -> NurbsCurve2D<f64> {
        let w = std::f64::consts::FRAC_1_SQRT_2;
        NurbsCurve2D::try_new(
            2,
            vec![
                Point3::new(1., 0., 1.),
                Point3::new(w, w, w),
                Point3::new(0., 1., 1.),
            ],
            vec![0., 0., 0., 1., 1., 1.],
        )
        .unwrap()
    }

    #[test]
    fn rational_points_lie_on_circle() {
        let c = quarter_circle();
        for i in 0..=10 {
            let t = i as f64 / 10.;
            let p = c.point_at(t);
            assert_relative_eq!(p.coords.norm(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(c.point_at(0.), Point2::new(1., 0.), epsilon = 1e-12);
        assert_relative_eq!(c.point_at(1.), Point2::new(0., 1.), epsilon = 1e-12);
    }

    #[test]
    fn rational_tangent_is_perpendicular_to_radius() {
        let c = quarter_circle();
        for t in [0.1, 0.5, 0.8] {
            let d = c.rational_derivatives(t, 1);
            assert_relative_eq!(d[0].dot(&d[1]), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let c = NurbsCurve3D::try_new(
            3,
            vec![
                Point4::new(0., 0., 0., 1.),
                Point4::new(1., 2., 0., 1.),
                Point4::new(3., 2., 2., 2.),
                Point4::new(4., 0., 1., 1.),
                Point4::new(5., 1., 0., 1.),
            ],
            vec![0., 0., 0., 0., 0.5, 1., 1., 1., 1.],
        )
        .unwrap();
        let h = 1e-6;
        for t in [0.2, 0.45, 0.7] {
            let d = c.rational_derivatives(t, 1);
            let fd = (c.point_at(t + h) - c.point_at(t - h)) / (2. * h);
            assert_relative_eq!(d[1], fd, epsilon = 1e-5);
            assert_relative_eq!(d[0], c.point_at(t).coords, epsilon = 1e-12);
        }
    }

    #[test]
    fn polyline_passes_through_points() {
        let pts = vec![
            Point3::new(0., 0., 0.),
            Point3::new(1., 0., 0.),
            Point3::new(1., 3., 0.),
        ];
        let c = NurbsCurve3D::try_polyline(&pts).unwrap();
        assert_eq!(c.degree(), 1);
        assert_relative_eq!(c.point_at(0.25), Point3::new(1., 0., 0.), epsilon = 1e-12);
        assert_relative_eq!(c.point_at(1.0), Point3::new(1., 3., 0.), epsilon = 1e-12);
        let tangent = &c.rational_derivatives(0.1, 1)[1];
        assert_relative_eq!(*tangent, Vector3::new(4., 0., 0.), epsilon = 1e-12);
    }

    #[test]
    fn interpolation_hits_every_point() {
        let pts: Vec<Point3<f64>> = (0..7)
            .map(|i| {
                let t = i as f64 * 0.5;
                Point3::new(t.cos(), t.sin(), 0.2 * t)
            })
            .collect();
        let c = NurbsCurve3D::try_interpolate(&pts, 3).unwrap();
        assert_eq!(c.control_points().len(), pts.len());
        // every sample lies on the curve, at or near its chord-length parameter
        let mut u = 0.;
        let total: f64 = pts.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        for (i, p) in pts.iter().enumerate() {
            if i > 0 {
                u += (pts[i] - pts[i - 1]).norm() / total;
            }
            assert_relative_eq!(c.point_at(u), *p, epsilon = 1e-9);
        }
    }

    #[test]
    fn invalid_knots_are_rejected() {
        let pts = vec![Point3::new(0., 0., 1.), Point3::new(1., 0., 1.)];
        assert!(NurbsCurve2D::try_new(1, pts.clone(), vec![0., 0., 1.]).is_err());
        assert!(NurbsCurve2D::try_new(1, pts, vec![0., 1., 0., 1.]).is_err());
    }
}
