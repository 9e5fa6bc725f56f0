//! Solver sessions
//!
//! A [`LayoutManager`] owns one `cassowary` solver loaded with the flat
//! constraint set of a single owning container. The container's own width
//! and height are edit variables; a layout pass suggests the current size
//! and reads every variable back through a [`Solution`].

use cassowary::strength::WEAK;
use cassowary::{
    AddConstraintError, AddEditVariableError, Constraint, RemoveConstraintError,
    RemoveEditVariableError, Solver, SuggestValueError, Variable,
};
use scene_model::NodeId;
use std::collections::{HashMap, HashSet};

/// Why a solver operation failed, before it is given a container context
#[derive(Debug, Clone)]
pub enum SolverFailure {
    /// A required constraint conflicts with the ones already added
    Unsatisfiable(Constraint),
    /// The solver reported an unbounded objective
    Unbounded(String),
    /// Anything else the solver reported
    Internal(String),
}

/// Variable values produced by a layout pass
#[derive(Debug)]
pub struct Solution<'a> {
    values: &'a HashMap<Variable, f64>,
}

impl Solution<'_> {
    /// Value of `var`; variables the solver never reported are zero
    pub fn value(&self, var: Variable) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }

    /// Evaluate a linear expression
    pub fn eval(&self, expr: &cassowary::Expression) -> f64 {
        expr.terms
            .iter()
            .map(|term| term.coefficient * self.value(term.variable))
            .sum::<f64>()
            + expr.constant
    }
}

/// An initialized solver for one owning container
pub struct LayoutManager {
    solver: Solver,
    width: Variable,
    height: Variable,
    strength: f64,
    values: HashMap<Variable, f64>,
    tracked: HashMap<NodeId, Vec<Constraint>>,
    constraint_count: usize,
}

impl LayoutManager {
    /// Load `constraints` plus the per-component `tracked` groups.
    ///
    /// `width`/`height` are the owning container's size variables; they
    /// become edit variables at `strength`.
    pub fn initialize(
        constraints: Vec<Constraint>,
        tracked: HashMap<NodeId, Vec<Constraint>>,
        width: Variable,
        height: Variable,
        strength: f64,
    ) -> Result<Self, SolverFailure> {
        let _timer = perf::PerfTimer::solve("solver_initialize");
        let mut solver = Solver::new();
        let mut seen = HashSet::new();
        let mut constraint_count = 0;

        let all = constraints.iter().chain(tracked.values().flatten());
        for cn in all {
            // The same constraint object may be spliced in twice
            if !seen.insert(cn.clone()) {
                continue;
            }
            solver.add_constraint(cn.clone()).map_err(|e| add_failure(e, cn))?;
            constraint_count += 1;
        }

        solver.add_edit_variable(width, strength).map_err(edit_failure)?;
        solver.add_edit_variable(height, strength).map_err(edit_failure)?;

        Ok(Self {
            solver,
            width,
            height,
            strength,
            values: HashMap::new(),
            tracked,
            constraint_count,
        })
    }

    pub fn constraint_count(&self) -> usize {
        self.constraint_count
    }

    /// Whether size constraints for `node` live in this session
    pub fn tracks(&self, node: NodeId) -> bool {
        self.tracked.contains_key(&node)
    }

    /// Resolve for the container size `(width, height)`
    pub fn solve_for(&mut self, size: (f64, f64)) -> Result<Solution<'_>, SolverFailure> {
        self.suggest(size)?;
        Ok(Solution {
            values: &self.values,
        })
    }

    /// The smallest container size the constraints permit
    pub fn min_size(&mut self) -> Result<(f64, f64), SolverFailure> {
        self.reweight(WEAK)?;
        let result = self.suggest((0.0, 0.0)).map(|_| {
            let w = self.values.get(&self.width).copied().unwrap_or(0.0);
            let h = self.values.get(&self.height).copied().unwrap_or(0.0);
            (w, h)
        });
        self.reweight(self.strength)?;
        result
    }

    /// Swap the tracked constraints of `node` for `new`
    pub fn replace_constraints(
        &mut self,
        node: NodeId,
        new: Vec<Constraint>,
    ) -> Result<(), SolverFailure> {
        for old in self.tracked.remove(&node).unwrap_or_default() {
            match self.solver.remove_constraint(&old) {
                Ok(()) => self.constraint_count -= 1,
                Err(RemoveConstraintError::UnknownConstraint) => {}
                Err(RemoveConstraintError::InternalSolverError(msg)) => {
                    return Err(SolverFailure::Internal(msg.to_string()))
                }
            }
        }
        for cn in &new {
            self.solver
                .add_constraint(cn.clone())
                .map_err(|e| add_failure(e, cn))?;
            self.constraint_count += 1;
        }
        self.tracked.insert(node, new);
        Ok(())
    }

    fn suggest(&mut self, (width, height): (f64, f64)) -> Result<(), SolverFailure> {
        self.solver
            .suggest_value(self.width, width)
            .map_err(suggest_failure)?;
        self.solver
            .suggest_value(self.height, height)
            .map_err(suggest_failure)?;
        for &(var, value) in self.solver.fetch_changes() {
            self.values.insert(var, value);
        }
        Ok(())
    }

    fn reweight(&mut self, strength: f64) -> Result<(), SolverFailure> {
        for var in [self.width, self.height] {
            match self.solver.remove_edit_variable(var) {
                Ok(()) | Err(RemoveEditVariableError::UnknownEditVariable) => {}
                Err(RemoveEditVariableError::InternalSolverError(msg)) => {
                    return Err(SolverFailure::Internal(msg.to_string()))
                }
            }
            self.solver
                .add_edit_variable(var, strength)
                .map_err(edit_failure)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for LayoutManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutManager")
            .field("constraint_count", &self.constraint_count)
            .field("tracked", &self.tracked.len())
            .field("strength", &self.strength)
            .finish()
    }
}

fn add_failure(err: AddConstraintError, cn: &Constraint) -> SolverFailure {
    match err {
        AddConstraintError::UnsatisfiableConstraint => SolverFailure::Unsatisfiable(cn.clone()),
        AddConstraintError::DuplicateConstraint => {
            SolverFailure::Internal("duplicate constraint".to_string())
        }
        AddConstraintError::InternalSolverError(msg) => internal(msg),
    }
}

fn edit_failure(err: AddEditVariableError) -> SolverFailure {
    match err {
        AddEditVariableError::DuplicateEditVariable => {
            SolverFailure::Internal("duplicate edit variable".to_string())
        }
        AddEditVariableError::BadRequiredStrength => {
            SolverFailure::Internal("edit variables cannot be required".to_string())
        }
    }
}

fn suggest_failure(err: SuggestValueError) -> SolverFailure {
    match err {
        SuggestValueError::UnknownEditVariable => {
            SolverFailure::Internal("unknown edit variable".to_string())
        }
        SuggestValueError::InternalSolverError(msg) => internal(msg),
    }
}

fn internal(msg: &str) -> SolverFailure {
    if msg.to_ascii_lowercase().contains("unbounded") {
        SolverFailure::Unbounded(msg.to_string())
    } else {
        SolverFailure::Internal(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cassowary::strength::{REQUIRED, STRONG, WEAK};
    use cassowary::WeightedRelation::{EQ, GE, LE};

    fn session(constraints: Vec<Constraint>, w: Variable, h: Variable) -> LayoutManager {
        LayoutManager::initialize(constraints, HashMap::new(), w, h, STRONG * 10.0).unwrap()
    }

    #[test]
    fn test_solve_for_tracks_container_size() {
        let (w, h) = (Variable::new(), Variable::new());
        let child = Variable::new();
        let mut mgr = session(vec![child |EQ(REQUIRED)| w * 0.5], w, h);

        let sol = mgr.solve_for((200.0, 100.0)).unwrap();
        assert!((sol.value(child) - 100.0).abs() < 1e-6);
        assert!((sol.value(h) - 100.0).abs() < 1e-6);

        let sol = mgr.solve_for((50.0, 100.0)).unwrap();
        assert!((sol.value(child) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_unsatisfiable_reports_constraint() {
        let (w, h) = (Variable::new(), Variable::new());
        let x = Variable::new();
        let bad = x |EQ(REQUIRED)| 20.0_f64;
        let result = LayoutManager::initialize(
            vec![x |EQ(REQUIRED)| 10.0, bad.clone()],
            HashMap::new(),
            w,
            h,
            STRONG,
        );
        match result {
            Err(SolverFailure::Unsatisfiable(cn)) => assert_eq!(cn, bad),
            other => panic!("expected unsatisfiable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_constraint_objects_are_added_once() {
        let (w, h) = (Variable::new(), Variable::new());
        let cn = w |GE(REQUIRED)| 0.0_f64;
        let mgr = session(vec![cn.clone(), cn], w, h);
        assert_eq!(mgr.constraint_count(), 1);
    }

    #[test]
    fn test_min_size_restores_strength() {
        let (w, h) = (Variable::new(), Variable::new());
        let child = Variable::new();
        let mut mgr = session(
            vec![
                child |GE(STRONG)| 40.0,
                child |LE(REQUIRED)| w,
                h |GE(REQUIRED)| 10.0,
            ],
            w,
            h,
        );
        let (min_w, min_h) = mgr.min_size().unwrap();
        assert!((min_w - 40.0).abs() < 1e-6);
        assert!((min_h - 10.0).abs() < 1e-6);

        let sol = mgr.solve_for((300.0, 30.0)).unwrap();
        assert!((sol.value(w) - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_replace_tracked_constraints() {
        let (w, h) = (Variable::new(), Variable::new());
        let node = NodeId::new();
        let child = Variable::new();
        let mut tracked = HashMap::new();
        tracked.insert(node, vec![child |EQ(WEAK)| 10.0]);
        let mut mgr =
            LayoutManager::initialize(vec![child |LE(REQUIRED)| w], tracked, w, h, STRONG).unwrap();
        assert!(mgr.tracks(node));

        mgr.replace_constraints(node, vec![child |EQ(WEAK)| 30.0]).unwrap();
        let sol = mgr.solve_for((100.0, 100.0)).unwrap();
        assert!((sol.value(child) - 30.0).abs() < 1e-6);
        assert_eq!(mgr.constraint_count(), 2);
    }

    #[test]
    fn test_eval_expression() {
        let (w, h) = (Variable::new(), Variable::new());
        let mut mgr = session(vec![], w, h);
        let sol = mgr.solve_for((10.0, 4.0)).unwrap();
        let expr = w + h * 2.0 + 1.0;
        assert!((sol.eval(&expr) - 19.0).abs() < 1e-6);
    }
}
