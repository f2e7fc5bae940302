use anyhow::Error;
use argmin::{
    argmin_error, argmin_error_closure,
    core::{
        ArgminFloat, CostFunction, Executor, Gradient, IterState, Problem, Solver, State,
        TerminationReason, TerminationStatus, KV,
    },
    float,
};
use nalgebra::{ComplexField, SMatrix, SVector};

use crate::misc::FloatingPoint;

type BFGSState<F, const N: usize> =
    IterState<SVector<F, N>, SVector<F, N>, (), SMatrix<F, N, N>, (), F>;

/// Quasi-Newton's method for refining the parameters of an intersection,
/// keeping every parameter inside its domain.
/// Original source: https://argmin-rs.github.io/argmin/argmin/solver/quasinewton/struct.BFGS.html
#[derive(Clone, Debug)]
pub struct IntersectionBFGS<F, const N: usize> {
    /// Closed interval each parameter is projected into
    domain: [(F, F); N],
    /// Tolerance for the stopping criterion based on the norm of the gradient
    tol_grad: F,
    /// Tolerance for the stopping criterion based on the change of the cost
    tol_cost: F,
}

impl<F, const N: usize> IntersectionBFGS<F, N>
where
    F: FloatingPoint,
{
    pub fn new(domain: [(F, F); N]) -> Self {
        IntersectionBFGS {
            domain,
            tol_grad: ComplexField::sqrt(F::default_epsilon()),
            tol_cost: F::default_epsilon(),
        }
    }

    pub fn with_tolerance_grad(mut self, tol_grad: F) -> Result<Self, Error> {
        if tol_grad < F::zero() {
            return Err(argmin_error!(
                InvalidParameter,
                "`IntersectionBFGS`: gradient tolerance must be >= 0."
            ));
        }
        self.tol_grad = tol_grad;
        Ok(self)
    }

    pub fn with_tolerance_cost(mut self, tol_cost: F) -> Result<Self, Error> {
        if tol_cost < F::zero() {
            return Err(argmin_error!(
                InvalidParameter,
                "`IntersectionBFGS`: cost tolerance must be >= 0."
            ));
        }
        self.tol_cost = tol_cost;
        Ok(self)
    }

    /// Clamp every parameter into its domain
    fn project(&self, mut x: SVector<F, N>) -> SVector<F, N> {
        for (i, (min, max)) in self.domain.iter().enumerate() {
            if x[i] < *min {
                x[i] = *min;
            } else if x[i] > *max {
                x[i] = *max;
            }
        }
        x
    }
}

impl<O, F, const N: usize> Solver<O, BFGSState<F, N>> for IntersectionBFGS<F, N>
where
    O: CostFunction<Param = SVector<F, N>, Output = F>
        + Gradient<Param = SVector<F, N>, Gradient = SVector<F, N>>,
    F: FloatingPoint + ArgminFloat,
{
    const NAME: &'static str = "Intersection quasi-newton method";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: BFGSState<F, N>,
    ) -> Result<(BFGSState<F, N>, Option<KV>), Error> {
        let x0 = state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            concat!(
                "`IntersectionBFGS` requires an initial parameter vector. ",
                "Please provide an initial guess via `Executor`s `configure` method."
            )
        ))?;
        let x0 = self.project(*x0);
        let cost = problem.cost(&x0)?;
        let grad = problem.gradient(&x0)?;

        Ok((state.param(x0).cost(cost).gradient(grad), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        mut state: BFGSState<F, N>,
    ) -> Result<(BFGSState<F, N>, Option<KV>), Error> {
        let x0 = state.take_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            concat!(
                "`IntersectionBFGS` requires an initial parameter vector. ",
                "Please provide an initial guess via `Executor`s `configure` method."
            )
        ))?;
        let g0 = match state.take_gradient() {
            Some(g) => g,
            None => problem.gradient(&x0)?,
        };
        let f0 = state.get_cost();

        let mut h0 = state
            .take_inv_hessian()
            .unwrap_or_else(SMatrix::<F, N, N>::identity);
        let mut direction = -(h0 * g0);

        // fall back to steepest descent if the curvature estimate went bad
        if direction.dot(&g0) >= F::zero() {
            h0 = SMatrix::identity();
            direction = -g0;
        }

        // backtracking line search with the armijo condition,
        // measured on the projected step so that the domain bounds are respected
        let c1 = float!(1e-4);
        let shrink = float!(0.5);
        let mut t = F::one();
        let mut x1 = x0;
        let mut f1 = f0;
        for _ in 0..64 {
            let candidate = self.project(x0 + direction * t);
            let s = candidate - x0;
            let fc = problem.cost(&candidate)?;
            if fc <= f0 + c1 * g0.dot(&s) {
                x1 = candidate;
                f1 = fc;
                break;
            }
            t *= shrink;
        }

        let g1 = problem.gradient(&x1)?;
        let s = x1 - x0;
        let y = g1 - g0;
        let ys = y.dot(&s);

        let h1 = if ys > F::default_epsilon() {
            let s_t = s * s.transpose();
            let hy = h0 * y;
            (h0 + s_t * ((ys + y.dot(&hy)) / (ys * ys)))
                - (((hy * s.transpose()) + (s * hy.transpose())) / ys)
        } else {
            h0
        };

        Ok((
            state.param(x1).cost(f1).gradient(g1).inv_hessian(h1),
            None,
        ))
    }

    fn terminate(&mut self, state: &BFGSState<F, N>) -> TerminationStatus {
        if let Some(g) = state.get_gradient() {
            if g.norm() < self.tol_grad {
                return TerminationStatus::Terminated(TerminationReason::SolverConverged);
            }
        }

        if ComplexField::abs(state.get_cost() - state.get_prev_cost()) < self.tol_cost {
            return TerminationStatus::Terminated(TerminationReason::SolverConverged);
        }

        TerminationStatus::NotTerminated
    }
}

/// Run [`IntersectionBFGS`] on `problem` from `seed`,
/// returning the best parameters & their cost.
pub fn minimize<O, F, const N: usize>(
    problem: O,
    solver: IntersectionBFGS<F, N>,
    seed: SVector<F, N>,
    max_iters: u64,
) -> anyhow::Result<(SVector<F, N>, F)>
where
    O: CostFunction<Param = SVector<F, N>, Output = F>
        + Gradient<Param = SVector<F, N>, Gradient = SVector<F, N>>,
    F: FloatingPoint + ArgminFloat,
{
    let res = Executor::new(problem, solver)
        .configure(|state| {
            state
                .param(seed)
                .inv_hessian(SMatrix::identity())
                .max_iters(max_iters)
        })
        .run()?;

    let state = res.state();
    let param = state
        .get_best_param()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No parameter found by the solver"))?;
    Ok((param, state.get_best_cost()))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use argmin::core::{CostFunction, Gradient};
    use nalgebra::Vector2;

    use super::{minimize, IntersectionBFGS};

    /// Rosenbrock-like valley with its minimum at (1, 1)
    struct Valley;

    impl CostFunction for Valley {
        type Param = Vector2<f64>;
        type Output = f64;

        fn cost(&self, p: &Self::Param) -> Result<Self::Output, anyhow::Error> {
            Ok((1. - p.x).powi(2) + 10. * (p.y - p.x * p.x).powi(2))
        }
    }

    impl Gradient for Valley {
        type Param = Vector2<f64>;
        type Gradient = Vector2<f64>;

        fn gradient(&self, p: &Self::Param) -> Result<Self::Gradient, anyhow::Error> {
            Ok(Vector2::new(
                -2. * (1. - p.x) - 40. * p.x * (p.y - p.x * p.x),
                20. * (p.y - p.x * p.x),
            ))
        }
    }

    #[test]
    fn finds_the_minimum_of_a_valley() {
        let solver = IntersectionBFGS::new([(-5., 5.), (-5., 5.)])
            .with_tolerance_cost(1e-20)
            .unwrap()
            .with_tolerance_grad(1e-10)
            .unwrap();
        let (x, cost) = minimize(Valley, solver, Vector2::new(-1.2, 1.), 500).unwrap();
        assert_relative_eq!(x, Vector2::new(1., 1.), epsilon = 1e-6);
        assert!(cost < 1e-12);
    }

    #[test]
    fn stays_inside_the_domain() {
        // unconstrained minimum at (1, 1) lies outside of the box
        let solver = IntersectionBFGS::new([(-2., 0.5), (-2., 2.)])
            .with_tolerance_cost(1e-20)
            .unwrap();
        let (x, _) = minimize(Valley, solver, Vector2::new(0., 0.), 500).unwrap();
        assert!(x.x <= 0.5 && x.x >= -2.);
        assert!(x.y <= 2. && x.y >= -2.);
    }

    #[test]
    fn negative_tolerances_are_rejected() {
        let solver = IntersectionBFGS::<f64, 2>::new([(0., 1.), (0., 1.)]);
        assert!(solver.clone().with_tolerance_cost(-1.).is_err());
        assert!(solver.with_tolerance_grad(-1.).is_err());
    }
}
