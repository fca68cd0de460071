//! C3: the MIP encoder and solver, gated behind the `mip` feature (§4.3).
//! Mirrors `RegAllocILP.cpp::solveWithILP`: one binary choice variable per
//! `(VReg, candidate PReg)` pair plus, for every spillable VReg, one binary
//! spill-escape variable; a choice constraint per VReg; a pairwise
//! interference constraint per overlapping VReg pair sharing a candidate
//! PReg; and an objective that prefers resolved hints, deterministic
//! candidate rank, and avoiding the spill cost.

use crate::data_structures::{Map, PReg, VReg};
use crate::host::{LivenessInfo, TargetInfo, VirtRegMap};
use crate::matrix::LiveRegMatrix;
use good_lp::{variable, Expression, ProblemVariables, Solution, SolverModel};
use log::debug;

/// The rounded solution of one MIP solve: a per-VReg assignment table and a
/// spill set, mirroring §4.3's "Output: two tables consumed by the driver".
pub struct MipSolution {
  assignments: Map<VReg, PReg>,
  spill_set: Vec<VReg>,
}

impl MipSolution {
  pub fn phys(&self, vreg: VReg) -> Option<PReg> {
    self.assignments.get(&vreg).copied()
  }

  pub fn spilled(&self) -> &[VReg] {
    &self.spill_set
  }
}

/// `RegAllocILP.cpp`'s `0.001 * PhysIndex` rank tie-breaker, kept identical
/// so the two implementations break ties the same way given the same
/// candidate order.
const RANK_PENALTY_PER_INDEX: f64 = 0.001;

/// The objective bonus (as a cost reduction) for choosing a VReg's resolved
/// hint register, taken verbatim from the reference implementation's
/// `-0.1` hint term.
const HINT_BONUS: f64 = 0.1;

/// Attempts to solve the whole-function assignment problem as a single 0/1
/// MIP. Returns `Ok(None)` (not `Err`) when there is nothing to encode, or
/// when the model is infeasible *a priori* — a non-spillable VReg with no
/// candidate at all — per §4.3's choice-constraint note; the driver treats
/// both as "fall back to greedy entirely", same as a genuine solver failure
/// (§7 kind 2, §10.3). Returns `Err` only once the solver has actually run
/// and rejected the model or left a variable undecided.
pub fn solve_with_mip<L: LivenessInfo, T: TargetInfo, V: VirtRegMap>(
  pending: &[VReg], liveness: &L, target: &T, vreg_map: &V, matrix: &LiveRegMatrix,
) -> Result<Option<MipSolution>, String> {
  if pending.is_empty() {
    return Ok(None);
  }

  let mut vars = ProblemVariables::new();
  // choice_vars[i][k] is the variable for pending[i] picking candidates[i][k].
  let mut choice_vars: Vec<Vec<good_lp::Variable>> = Vec::with_capacity(pending.len());
  let mut candidates: Vec<Vec<PReg>> = Vec::with_capacity(pending.len());
  // spill_vars[i] is Some(var) iff pending[i] is spillable.
  let mut spill_vars: Vec<Option<good_lp::Variable>> = Vec::with_capacity(pending.len());

  for &vreg in pending {
    let interval = liveness.interval(vreg);
    let feasible: Vec<PReg> = target
      .allocation_order(vreg)
      .iter()
      .copied()
      .filter(|&p| {
        matrix.check(p, target.reg_units(p), vreg, interval) != crate::matrix::InterferenceKind::Fixed
      })
      .collect();

    let spillable = target.is_spillable(vreg);
    if feasible.is_empty() && !spillable {
      debug!("mip: {:?} is non-spillable with no feasible candidate, infeasible a priori", vreg);
      return Ok(None);
    }

    let row: Vec<good_lp::Variable> = feasible.iter().map(|_| vars.add(variable().binary())).collect();
    choice_vars.push(row);
    spill_vars.push(if spillable { Some(vars.add(variable().binary())) } else { None });
    candidates.push(feasible);
  }

  // Objective: minimize sum of (rank penalty - hint bonus) per choice
  // variable, plus weight(v) per spill variable (§4.3 "Objective").
  let mut objective = Expression::from(0.0);
  for (i, &vreg) in pending.iter().enumerate() {
    let hint = vreg_map.resolve_hint(vreg);
    for (rank, &preg) in candidates[i].iter().enumerate() {
      let mut coeff = RANK_PENALTY_PER_INDEX * rank as f64;
      if hint == Some(preg) {
        coeff -= HINT_BONUS;
      }
      objective += coeff * choice_vars[i][rank];
    }
    if let Some(s) = spill_vars[i] {
      objective += liveness.interval(vreg).weight() as f64 * s;
    }
  }

  let mut problem = vars.minimise(objective).using(good_lp::default_solver);

  // Choice constraint: sum(x[v, *]) + s[v] = 1 (§4.3).
  for i in 0..pending.len() {
    let mut sum: Expression = choice_vars[i].iter().fold(Expression::from(0.0), |acc, &v| acc + v);
    if let Some(s) = spill_vars[i] {
      sum += s;
    }
    problem = problem.with(sum.eq(1.0));
  }

  // Interference constraint: for every pair of pending VRegs whose
  // intervals overlap, and every PReg in both their feasible candidate
  // sets, at most one may choose it (§4.3; computed at VReg/interval
  // granularity, not per register-unit — see the module-level note on why
  // this is safe-but-not-maximal, §9).
  for i in 0..pending.len() {
    for j in (i + 1)..pending.len() {
      if !liveness.interval(pending[i]).overlaps(liveness.interval(pending[j])) {
        continue;
      }
      for (ci, &preg_i) in candidates[i].iter().enumerate() {
        if let Some(cj) = candidates[j].iter().position(|&p| p == preg_i) {
          let sum = Expression::from(choice_vars[i][ci]) + Expression::from(choice_vars[j][cj]);
          problem = problem.with(sum.leq(1.0));
        }
      }
    }
  }

  let solution = problem.solve().map_err(|e| format!("mip solver failed: {:?}", e))?;

  let mut assignments = Map::default();
  let mut spill_set = Vec::new();
  for (i, &vreg) in pending.iter().enumerate() {
    let chosen = choice_vars[i].iter().position(|&v| solution.value(v) > 0.5);
    match chosen {
      Some(k) => {
        assignments.insert(vreg, candidates[i][k]);
      }
      None => match spill_vars[i] {
        Some(s) if solution.value(s) > 0.5 => spill_set.push(vreg),
        _ => return Err(format!("{:?} rounded to neither a candidate nor spilled", vreg)),
      },
    }
  }

  debug!("mip: solved {} vregs ({} spilled) in a single model", pending.len(), spill_set.len());
  Ok(Some(MipSolution { assignments, spill_set }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data_structures::{CodePosition, CodeRange, LiveInterval, RegUnit};
  use std::collections::HashMap as StdMap;

  struct FakeTarget {
    orders: StdMap<u32, Vec<PReg>>,
    units: StdMap<u32, Vec<RegUnit>>,
    unspillable: Vec<u32>,
  }

  impl TargetInfo for FakeTarget {
    fn allocation_order(&self, vreg: VReg) -> &[PReg] {
      self.orders.get(&vreg.get()).map(|v| v.as_slice()).unwrap_or(&[])
    }
    fn reg_units(&self, preg: PReg) -> &[RegUnit] {
      self.units.get(&preg.get()).map(|v| v.as_slice()).unwrap_or(&[])
    }
    fn is_spillable(&self, vreg: VReg) -> bool {
      !self.unspillable.contains(&vreg.get())
    }
  }

  struct FakeLiveness {
    intervals: StdMap<u32, LiveInterval>,
  }
  impl LivenessInfo for FakeLiveness {
    fn interval(&self, vreg: VReg) -> &LiveInterval {
      self.intervals.get(&vreg.get()).expect("test interval missing")
    }
  }

  struct FakeVrm;
  impl VirtRegMap for FakeVrm {
    fn has_phys(&self, _vreg: VReg) -> bool {
      false
    }
    fn phys(&self, _vreg: VReg) -> Option<PReg> {
      None
    }
    fn set_phys(&mut self, _vreg: VReg, _preg: PReg) {}
    fn clear_phys(&mut self, _vreg: VReg) {}
  }

  fn interval(weight: f32) -> LiveInterval {
    LiveInterval::new(vec![CodeRange::new(CodePosition::new(0), CodePosition::new(4))], weight)
  }

  #[test]
  fn empty_pending_list_yields_no_solution() {
    let target = FakeTarget { orders: StdMap::new(), units: StdMap::new(), unspillable: Vec::new() };
    let liveness = FakeLiveness { intervals: StdMap::new() };
    let matrix = LiveRegMatrix::new();
    let result = solve_with_mip(&[], &liveness, &target, &FakeVrm, &matrix).unwrap();
    assert!(result.is_none());
  }

  #[test]
  fn two_non_interfering_vregs_each_get_their_only_candidate() {
    let mut orders = StdMap::new();
    orders.insert(0, vec![PReg::new(0)]);
    orders.insert(1, vec![PReg::new(1)]);
    let mut units = StdMap::new();
    units.insert(0, vec![RegUnit::new(0)]);
    units.insert(1, vec![RegUnit::new(1)]);
    let target = FakeTarget { orders, units, unspillable: Vec::new() };
    let mut intervals = StdMap::new();
    intervals.insert(0, interval(1.0));
    intervals.insert(1, interval(1.0));
    let liveness = FakeLiveness { intervals };
    let matrix = LiveRegMatrix::new();
    let pending = [VReg::new(0), VReg::new(1)];
    let solved = solve_with_mip(&pending, &liveness, &target, &FakeVrm, &matrix).unwrap().unwrap();
    assert_eq!(solved.phys(VReg::new(0)), Some(PReg::new(0)));
    assert_eq!(solved.phys(VReg::new(1)), Some(PReg::new(1)));
    assert!(solved.spilled().is_empty());
  }

  #[test]
  fn non_spillable_vreg_with_no_candidate_is_infeasible_a_priori() {
    let mut orders = StdMap::new();
    orders.insert(0, Vec::new());
    let target = FakeTarget { orders, units: StdMap::new(), unspillable: vec![0] };
    let mut intervals = StdMap::new();
    intervals.insert(0, interval(1.0));
    let liveness = FakeLiveness { intervals };
    let matrix = LiveRegMatrix::new();
    let result = solve_with_mip(&[VReg::new(0)], &liveness, &target, &FakeVrm, &matrix).unwrap();
    assert!(result.is_none());
  }

  #[test]
  fn spillable_vreg_with_no_candidate_is_still_encodable() {
    let mut orders = StdMap::new();
    orders.insert(0, Vec::new());
    let target = FakeTarget { orders, units: StdMap::new(), unspillable: Vec::new() };
    let mut intervals = StdMap::new();
    intervals.insert(0, interval(1.0));
    let liveness = FakeLiveness { intervals };
    let matrix = LiveRegMatrix::new();
    let solved = solve_with_mip(&[VReg::new(0)], &liveness, &target, &FakeVrm, &matrix).unwrap().unwrap();
    assert_eq!(solved.phys(VReg::new(0)), None);
    assert_eq!(solved.spilled(), &[VReg::new(0)]);
  }
}
