//! Z3 session wrapper: variables, assumption frames, checks, models.

use log::trace;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use seqprint_geometry::Rational;
use z3::ast::{Bool, Real};
use z3::{Config, Context, SatResult, Solver};

use crate::error::{Result, SolverError};

/// Build a Z3 context for one scheduler invocation.
///
/// `timeout_ms` is a textual decimal in milliseconds and is handed to the
/// solver configuration unchanged; an empty string leaves the solver
/// without a wall-clock budget.
pub fn solver_context(timeout_ms: &str) -> Context {
    let mut config = Config::new();
    if !timeout_ms.is_empty() {
        config.set_param_value("timeout", timeout_ms);
    }
    Context::new(&config)
}

/// Outcome of a satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// A model exists.
    Sat,
    /// The constraints are contradictory.
    Unsat,
    /// The solver gave up, typically on timeout.
    Unknown,
}

/// One solver session. Created per scheduler bed, reused across the
/// bed-box shrinking search and the refinement iterations, dropped when
/// the bed closes.
pub struct Session<'ctx> {
    ctx: &'ctx Context,
    solver: Solver<'ctx>,
}

impl<'ctx> Session<'ctx> {
    /// Create a session on a context.
    pub fn new(ctx: &'ctx Context) -> Self {
        Self {
            ctx,
            solver: Solver::new(ctx),
        }
    }

    /// The underlying context, for expression construction.
    pub fn ctx(&self) -> &'ctx Context {
        self.ctx
    }

    /// Create a named real decision variable.
    pub fn real_var(&self, name: &str) -> Real<'ctx> {
        Real::new_const(self.ctx, name)
    }

    /// Assert a formula in the current frame.
    pub fn assert(&self, formula: &Bool<'ctx>) {
        self.solver.assert(formula);
    }

    /// Open a retractable assumption frame. The frame pops when the
    /// returned guard is dropped, including on early-exit paths.
    pub fn frame(&self) -> Frame<'_, 'ctx> {
        self.solver.push();
        Frame { session: self }
    }

    /// Run a satisfiability check.
    pub fn check(&self) -> CheckOutcome {
        let outcome = match self.solver.check() {
            SatResult::Sat => CheckOutcome::Sat,
            SatResult::Unsat => CheckOutcome::Unsat,
            SatResult::Unknown => CheckOutcome::Unknown,
        };
        trace!("solver check: {outcome:?}");
        outcome
    }

    /// Extract the exact rational value of a variable from the model of
    /// the last satisfiable check.
    pub fn model_value(&self, var: &Real<'ctx>) -> Result<Rational> {
        let model = self
            .solver
            .get_model()
            .ok_or(SolverError::ModelUnavailable)?;
        let value = model
            .eval(var, true)
            .ok_or(SolverError::ModelUnavailable)?;
        let (numer, denom) = value
            .as_real()
            .ok_or_else(|| SolverError::ModelOutOfRange(var.to_string()))?;
        Ok(Rational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    /// Build a real constant from an exact rational.
    pub fn real_const(&self, value: &Rational) -> Real<'ctx> {
        if let (Some(numer), Some(denom)) = (value.numer().to_i32(), value.denom().to_i32()) {
            return Real::from_real(self.ctx, numer, denom);
        }
        from_real_strings(self.ctx, value.numer(), value.denom())
    }

    /// Build a real constant from an integer.
    pub fn int_const(&self, value: i64) -> Real<'ctx> {
        if let Ok(value) = i32::try_from(value) {
            return Real::from_real(self.ctx, value, 1);
        }
        from_real_strings(self.ctx, &BigInt::from(value), &BigInt::from(1))
    }
}

fn from_real_strings<'ctx>(ctx: &'ctx Context, numer: &BigInt, denom: &BigInt) -> Real<'ctx> {
    // Decimal renderings of integers are always valid numerals.
    Real::from_real_str(ctx, &numer.to_string(), &denom.to_string())
        .expect("integer strings form a valid real numeral")
}

/// Scope guard for one assumption frame.
pub struct Frame<'s, 'ctx> {
    session: &'s Session<'ctx>,
}

impl Drop for Frame<'_, '_> {
    fn drop(&mut self) {
        self.session.solver.pop(1);
    }
}
