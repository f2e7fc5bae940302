use nalgebra::{
    allocator::Allocator, Const, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint,
    OVector, Vector2, Vector3, U1,
};

use crate::{
    curve::dehomogenize,
    knot::KnotVector,
    mesh::TriangleMesh,
    misc::{Binomial, FloatingPoint},
};

/// NURBS surface representation
/// by generics, it can be used for 2D or 3D surfaces with f32 or f64 scalar types
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "T: serde::Serialize, OPoint<T, D>: serde::Serialize",
        deserialize = "T: serde::Deserialize<'de>, OPoint<T, D>: serde::Deserialize<'de>"
    ))
)]
pub struct NurbsSurface<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// control points with homogeneous coordinates, indexed `[u][v]`
    /// the last element of the vector is the `weight`
    control_points: Vec<Vec<OPoint<T, D>>>,
    u_degree: usize,
    v_degree: usize,
    u_knots: KnotVector<T>,
    v_knots: KnotVector<T>,
}

/// 3D NURBS surface alias
pub type NurbsSurface3D<T> = NurbsSurface<T, Const<4>>;

impl<T: FloatingPoint, D: DimName> NurbsSurface<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    /// Create a new NURBS surface
    /// # Failures
    /// - if the control point grid is empty or ragged
    /// - if a knot vector does not match its control point count and degree
    pub fn try_new(
        u_degree: usize,
        v_degree: usize,
        u_knots: Vec<T>,
        v_knots: Vec<T>,
        control_points: Vec<Vec<OPoint<T, D>>>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !control_points.is_empty() && !control_points[0].is_empty(),
            "Control point grid is empty"
        );
        let cols = control_points[0].len();
        anyhow::ensure!(
            control_points.iter().all(|row| row.len() == cols),
            "Control point grid rows differ in length"
        );
        let rows = control_points.len();
        anyhow::ensure!(
            rows > u_degree && cols > v_degree,
            "Too few control points for surface"
        );
        anyhow::ensure!(
            u_knots.len() == rows + u_degree + 1,
            "Invalid number of u knots, got {}, expected {}",
            u_knots.len(),
            rows + u_degree + 1
        );
        anyhow::ensure!(
            v_knots.len() == cols + v_degree + 1,
            "Invalid number of v knots, got {}, expected {}",
            v_knots.len(),
            cols + v_degree + 1
        );
        anyhow::ensure!(
            u_knots.windows(2).all(|w| w[0] <= w[1]) && v_knots.windows(2).all(|w| w[0] <= w[1]),
            "Knots must be non-decreasing"
        );

        Ok(Self {
            u_degree,
            v_degree,
            u_knots: KnotVector::new(u_knots),
            v_knots: KnotVector::new(v_knots),
            control_points,
        })
    }

    pub fn u_degree(&self) -> usize {
        self.u_degree
    }

    pub fn v_degree(&self) -> usize {
        self.v_degree
    }

    pub fn u_knots(&self) -> &KnotVector<T> {
        &self.u_knots
    }

    pub fn v_knots(&self) -> &KnotVector<T> {
        &self.v_knots
    }

    pub fn control_points(&self) -> &Vec<Vec<OPoint<T, D>>> {
        &self.control_points
    }

    /// Get the u domain of the knot vector by degree
    pub fn u_knots_domain(&self) -> (T, T) {
        self.u_knots.domain(self.u_degree)
    }

    /// Get the v domain of the knot vector by degree
    pub fn v_knots_domain(&self) -> (T, T) {
        self.v_knots.domain(self.v_degree)
    }

    /// Get the u & v domains
    pub fn knots_domain(&self) -> ((T, T), (T, T)) {
        (self.u_knots_domain(), self.v_knots_domain())
    }

    /// Evaluate the surface at the given u, v parameters to get a point
    pub fn point_at(&self, u: T, v: T) -> OPoint<T, DimNameDiff<D, U1>> {
        let p = self.point(u, v);
        dehomogenize(&p).unwrap_or_else(OPoint::origin)
    }

    /// Evaluate the surface at the given u, v parameters to get a homogeneous point
    pub fn point(&self, u: T, v: T) -> OPoint<T, D> {
        let n = self.u_knots.len() - self.u_degree - 2;
        let m = self.v_knots.len() - self.v_degree - 2;

        let knot_span_index_u = self.u_knots.find_knot_span_index(n, self.u_degree, u);
        let knot_span_index_v = self.v_knots.find_knot_span_index(m, self.v_degree, v);
        let u_basis_vals = self
            .u_knots
            .basis_functions(knot_span_index_u, u, self.u_degree);
        let v_basis_vals = self
            .v_knots
            .basis_functions(knot_span_index_v, v, self.v_degree);

        self.point_given_bases_knot_spans(
            knot_span_index_u,
            knot_span_index_v,
            &u_basis_vals,
            &v_basis_vals,
        )
    }

    /// Compute a regularly spaced grid of points on surface, `(divs_u + 1) x (divs_v + 1)` of them.
    /// The basis functions are computed once per row & column.
    pub fn regular_sample_points(
        &self,
        divs_u: usize,
        divs_v: usize,
    ) -> Vec<Vec<OPoint<T, DimNameDiff<D, U1>>>> {
        let (knot_spans_u, bases_u) = self
            .u_knots
            .regularly_spaced_basis_functions(self.u_degree, divs_u);
        let (knot_spans_v, bases_v) = self
            .v_knots
            .regularly_spaced_basis_functions(self.v_degree, divs_v);

        (0..=divs_u)
            .map(|i| {
                (0..=divs_v)
                    .map(|j| {
                        let pt = self.point_given_bases_knot_spans(
                            knot_spans_u[i],
                            knot_spans_v[j],
                            &bases_u[i],
                            &bases_v[j],
                        );
                        dehomogenize(&pt).unwrap_or_else(OPoint::origin)
                    })
                    .collect()
            })
            .collect()
    }

    /// Compute a point on the surface given the basis functions and knot spans
    fn point_given_bases_knot_spans(
        &self,
        knot_span_u: usize,
        knot_span_v: usize,
        bases_u: &[T],
        bases_v: &[T],
    ) -> OPoint<T, D> {
        let mut position = OPoint::<T, D>::origin();

        let uind = knot_span_u - self.u_degree;
        let mut vind = knot_span_v - self.v_degree;

        for bv in bases_v.iter().take(self.v_degree + 1) {
            let mut temp = OVector::<T, D>::zeros();

            for (k, bu) in bases_u.iter().enumerate().take(self.u_degree + 1) {
                temp += &self.control_points[uind + k][vind].coords * *bu;
            }

            vind += 1;

            position.coords += temp * *bv;
        }

        position
    }

    /// Evaluate the rational derivatives at the given u, v parameters.
    /// `ders[k][l]` is the derivative of order `k` in u and `l` in v
    pub fn rational_derivatives(
        &self,
        u: T,
        v: T,
        derivs: usize,
    ) -> Vec<Vec<OVector<T, DimNameDiff<D, U1>>>> {
        let ders = self.derivatives(u, v, derivs);
        rational_derivatives(&ders, derivs)
    }

    /// Evaluate the homogeneous derivatives at the given u, v parameters
    fn derivatives(&self, u: T, v: T, derivs: usize) -> Vec<Vec<OVector<T, D>>> {
        let n = self.u_knots.len() - self.u_degree - 2;
        let m = self.v_knots.len() - self.v_degree - 2;

        let du = derivs.min(self.u_degree);
        let dv = derivs.min(self.v_degree);

        let mut skl = vec![vec![OVector::<T, D>::zeros(); derivs + 1]; derivs + 1];
        let knot_span_index_u = self.u_knots.find_knot_span_index(n, self.u_degree, u);
        let knot_span_index_v = self.v_knots.find_knot_span_index(m, self.v_degree, v);
        let uders = self
            .u_knots
            .derivative_basis_functions(knot_span_index_u, u, self.u_degree, du);
        let vders = self
            .v_knots
            .derivative_basis_functions(knot_span_index_v, v, self.v_degree, dv);
        let mut temp = vec![OVector::<T, D>::zeros(); self.v_degree + 1];

        for k in 0..=du {
            for (s, t) in temp.iter_mut().enumerate() {
                *t = OVector::<T, D>::zeros();
                for r in 0..=self.u_degree {
                    *t += &self.control_points[knot_span_index_u - self.u_degree + r]
                        [knot_span_index_v - self.v_degree + s]
                        .coords
                        * uders[k][r];
                }
            }

            let dd = (derivs - k).min(dv);
            for l in 0..=dd {
                for (s, t) in temp.iter().enumerate() {
                    skl[k][l] += t * vders[l][s];
                }
            }
        }

        skl
    }
}

impl<T: FloatingPoint> NurbsSurface3D<T> {
    /// Position, partial derivatives & unit normal at the given u, v parameters.
    /// The normal is `None` where the partials are parallel (degenerate point).
    pub fn frame_at(&self, u: T, v: T) -> SurfaceFrame<T> {
        let ders = self.rational_derivatives(u, v, 1);
        let point = OPoint::from(ders[0][0]);
        let du = ders[1][0];
        let dv = ders[0][1];
        let normal = du.cross(&dv).try_normalize(T::zero());
        SurfaceFrame {
            point,
            du,
            dv,
            normal,
        }
    }

    /// Regularly tessellate the surface into a triangle mesh with `(divs_u + 1) x (divs_v + 1)` vertices.
    /// Every vertex carries the uv it was evaluated at.
    pub fn regular_tessellate(&self, divs_u: usize, divs_v: usize) -> TriangleMesh<T> {
        let divs_u = divs_u.max(1);
        let divs_v = divs_v.max(1);

        let points: Vec<_> = self
            .regular_sample_points(divs_u, divs_v)
            .into_iter()
            .flatten()
            .collect();
        let u_span = self.u_knots.regularly_spaced_span(self.u_degree, divs_u);
        let v_span = self.v_knots.regularly_spaced_span(self.v_degree, divs_v);

        let faces = (0..divs_u)
            .flat_map(|iu| {
                let ioff = iu * (divs_v + 1);
                (0..divs_v).flat_map(move |iv| {
                    [
                        [ioff + iv, ioff + iv + 1, ioff + iv + divs_v + 2],
                        [ioff + iv, ioff + iv + divs_v + 2, ioff + iv + divs_v + 1],
                    ]
                })
            })
            .collect();
        let uvs = (0..=divs_u)
            .flat_map(|iu| {
                let u = u_span.0 + u_span.2 * T::constant(iu as f64);
                (0..=divs_v).map(move |iv| {
                    let v = v_span.0 + v_span.2 * T::constant(iv as f64);
                    Vector2::new(u, v)
                })
            })
            .collect();

        TriangleMesh::from_parts(points, faces, uvs)
    }
}

/// Local differential geometry of a surface at one parameter pair
#[derive(Clone, Debug)]
pub struct SurfaceFrame<T: FloatingPoint> {
    pub point: OPoint<T, Const<3>>,
    pub du: Vector3<T>,
    pub dv: Vector3<T>,
    pub normal: Option<Vector3<T>>,
}

/// Compute the rational derivatives from the homogeneous ones
fn rational_derivatives<T, D>(
    ders: &[Vec<OVector<T, D>>],
    derivs: usize,
) -> Vec<Vec<OVector<T, DimNameDiff<D, U1>>>>
where
    T: FloatingPoint,
    D: DimName,
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let a_ders: Vec<Vec<_>> = ders
        .iter()
        .map(|row| {
            row.iter()
                .map(|d| {
                    OVector::<T, DimNameDiff<D, U1>>::from_iterator(
                        d.iter().take(D::dim() - 1).cloned(),
                    )
                })
                .collect()
        })
        .collect();
    let w_ders: Vec<Vec<_>> = ders
        .iter()
        .map(|row| row.iter().map(|d| d[D::dim() - 1]).collect())
        .collect();

    let mut skl: Vec<Vec<OVector<T, DimNameDiff<D, U1>>>> = vec![];
    let mut binom = Binomial::<T>::new();

    for k in 0..=derivs {
        let mut row: Vec<OVector<T, DimNameDiff<D, U1>>> = vec![];

        for l in 0..=(derivs - k) {
            let mut v = a_ders[k][l].clone();
            for j in 1..=l {
                let coef = binom.get(l, j) * w_ders[0][j];
                v -= &row[l - j] * coef;
            }

            for i in 1..=k {
                let coef = binom.get(k, i) * w_ders[i][0];
                v -= &skl[k - i][l] * coef;
                let mut v2 = OVector::<T, DimNameDiff<D, U1>>::zeros();
                for j in 1..=l {
                    v2 += &skl[k - i][l - j] * (binom.get(l, j) * w_ders[i][j]);
                }
                v -= v2 * binom.get(k, i);
            }

            row.push(v / w_ders[0][0]);
        }

        skl.push(row);
    }

    skl
}
