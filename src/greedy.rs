//! C4: the greedy fallback selector, used whenever the MIP path is disabled,
//! fails, or has already been attempted once for the current function
//! (§4.4). Mirrors `RegAllocILP.cpp::selectOrSplitFallback` and
//! `::spillInterferences`: walk the allocation order, take the first free
//! candidate; if none is free, evict every interferer of the first
//! evictable candidate in order (each no heavier than the VReg being
//! placed, and each itself spillable), or spill the VReg itself if it is
//! spillable, or fail outright if it is not.

use crate::data_structures::{LiveInterval, PReg, RegUnit, VReg};
use crate::host::{LivenessInfo, TargetInfo};
use crate::matrix::{InterferenceKind, LiveRegMatrix};
use log::{debug, trace};

/// The outcome of one fallback placement attempt.
pub enum FallbackResult {
  /// `vreg` was assigned to a free candidate with no eviction necessary.
  Assigned(PReg),
  /// `vreg` was assigned after evicting the given lighter-or-equal-weight
  /// occupants, which the caller must unassign and run through the spiller
  /// (§4.4 step 2: eviction is followed by a spill of each interferer, not
  /// a re-enqueue — an evicted interval is still live and still wants the
  /// very register it was just kicked off of).
  AssignedWithEvictions { preg: PReg, evicted: Vec<VReg> },
  /// No candidate could be freed cheaply enough, but `vreg` is spillable:
  /// the caller invokes the `Spiller` on `vreg` itself and re-enqueues any
  /// split products it returns (§4.4 step 3, §4.5).
  MustSpill,
  /// No candidate could be freed, and `vreg` is not spillable: an
  /// unconditional allocation failure for this function (§3 invariants,
  /// §7 kind 3).
  Fatal,
}

/// §4.4: try every candidate in order; the first wholly free one wins
/// outright. If none are free, take the first candidate in order whose
/// every interferer is spillable and no heavier than `vreg` — allocation
/// order is authoritative, not eviction cost (`RegAllocILP.cpp::selectOrSplitFallback`
/// returns on the first `PhysRegSpillCands` entry that clears `spillInterferences`,
/// it never compares candidates against each other). If even that doesn't
/// exist, `vreg` is spilled if it can be, else the allocation fails for
/// this function.
pub fn select_or_split_fallback<T: TargetInfo, L: LivenessInfo>(
  vreg: VReg, target: &T, liveness: &L, matrix: &LiveRegMatrix,
) -> FallbackResult {
  let order = target.allocation_order(vreg);
  let interval = liveness.interval(vreg);
  let vreg_weight = interval.weight();

  // First pass: any wholly free candidate wins immediately, same priority
  // `selectOrSplitFallback` gives a clean register over an eviction.
  for &preg in order {
    let units = target.reg_units(preg);
    if matrix.check(preg, units, vreg, interval) == InterferenceKind::Free {
      trace!("greedy: {:?} placed at {:?} with no eviction", vreg, preg);
      return FallbackResult::Assigned(preg);
    }
  }

  // Second pass: the first candidate in order whose interferers can all be
  // evicted wins outright; later candidates are never even examined once
  // one has succeeded.
  for &preg in order {
    let units = target.reg_units(preg);
    if matrix.check(preg, units, vreg, interval) == InterferenceKind::Fixed {
      continue;
    }
    if let Some(evicted) = spill_interferences(units, interval, vreg_weight, target, liveness, matrix) {
      debug!(
        "greedy: {:?} (weight {}) evicts {} occupant(s) from {:?}",
        vreg,
        vreg_weight,
        evicted.len(),
        preg
      );
      return FallbackResult::AssignedWithEvictions { preg, evicted };
    }
  }

  if target.is_spillable(vreg) {
    debug!("greedy: {:?} (weight {}) has no affordable eviction, must spill", vreg, vreg_weight);
    FallbackResult::MustSpill
  } else {
    debug!("greedy: {:?} (weight {}) is not spillable and has no feasible physreg", vreg, vreg_weight);
    FallbackResult::Fatal
  }
}

/// §4.4 "spillInterferences": the occupants across `units` that would need
/// to move for `vreg` to land there. Returns `None` if any occupant is
/// non-spillable or strictly heavier than `vreg` (the reference pass never
/// evicts such an interval, since that can't make progress) or if there are
/// no occupants at all (the `Free` case is already handled by the caller's
/// first pass).
fn spill_interferences<T: TargetInfo, L: LivenessInfo>(
  units: &[RegUnit], interval: &LiveInterval, vreg_weight: f32, target: &T, liveness: &L,
  matrix: &LiveRegMatrix,
) -> Option<Vec<VReg>> {
  let interferers = matrix.interferers(units, interval);
  if interferers.is_empty() {
    return None;
  }

  for &occ in &interferers {
    if !target.is_spillable(occ) {
      return None;
    }
    if liveness.interval(occ).weight() > vreg_weight {
      return None;
    }
  }
  Some(interferers)
}
