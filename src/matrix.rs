//! C2: the interference oracle. Tracks, per register unit, which virtual
//! registers currently occupy it and during which live ranges, and answers
//! interference queries the MIP encoder and the greedy fallback both depend
//! on (§4.2). A unit can be shared over time by any number of VRegs whose
//! intervals never overlap — that temporal reuse is the entire point of
//! register allocation, so every query here is gated on `LiveInterval::overlaps`,
//! not on bare occupancy.

use crate::data_structures::{LiveInterval, Map, PReg, RegUnit, VReg};

/// The result of checking one `(interval, PReg)` pair against the matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterferenceKind {
  /// No register unit of the PReg carries an overlapping interval.
  Free,
  /// At least one register unit carries an overlapping interval belonging
  /// to another virtual register.
  VirtReg,
  /// At least one register unit is reserved for a fixed/physical use that
  /// can never be evicted (e.g. an ABI-mandated register).
  Fixed,
}

/// Per-register-unit occupancy: each unit maps to the live intervals
/// currently assigned across it, tagged by the VReg they belong to.
#[derive(Default)]
pub struct LiveRegMatrix {
  occupants: Map<RegUnit, Vec<(VReg, LiveInterval)>>,
  fixed: Map<RegUnit, ()>,
}

impl LiveRegMatrix {
  pub fn new() -> Self {
    LiveRegMatrix { occupants: Map::default(), fixed: Map::default() }
  }

  /// Marks `unit` as permanently reserved (never assignable to a VReg).
  /// Used for ABI-fixed registers outside the spec's scope to model in
  /// detail but whose presence the matrix must still refuse to overwrite.
  pub fn reserve_fixed(&mut self, unit: RegUnit) {
    self.fixed.insert(unit, ());
  }

  /// §4.2 "check": whether `preg`'s register units are free for `interval`,
  /// and with what kind of blocker if not. Mirrors `Matrix->checkInterference(LiveInterval&, unsigned)`,
  /// which is exactly this: an interval-overlap test against whatever is
  /// currently checked into each unit, not a time-blind occupancy test.
  pub fn check(
    &self, preg: PReg, units: &[RegUnit], vreg: VReg, interval: &LiveInterval,
  ) -> InterferenceKind {
    let mut any_vreg = false;
    for unit in units {
      if self.fixed.contains_key(unit) {
        return InterferenceKind::Fixed;
      }
      if let Some(occ) = self.occupants.get(unit) {
        if occ.iter().any(|(v, iv)| *v != vreg && iv.overlaps(interval)) {
          any_vreg = true;
        }
      }
    }
    let _ = preg;
    if any_vreg {
      InterferenceKind::VirtReg
    } else {
      InterferenceKind::Free
    }
  }

  /// §4.2 "interferers": every VReg whose checked-in interval overlaps
  /// `interval` across any unit of `preg`, in reverse insertion order — the
  /// reference implementation iterates `Matrix->query(...).interferingVRegs()`
  /// and walks it with `reverse()` so that the most recently assigned
  /// interferer is evicted first, which tends to be the one with the
  /// shortest remaining lifetime.
  pub fn interferers(&self, units: &[RegUnit], interval: &LiveInterval) -> Vec<VReg> {
    let mut seen = Map::default();
    let mut out = Vec::new();
    for unit in units {
      if let Some(occ) = self.occupants.get(unit) {
        for (v, iv) in occ.iter().rev() {
          if iv.overlaps(interval) && seen.insert(*v, ()).is_none() {
            out.push(*v);
          }
        }
      }
    }
    out
  }

  /// Occupies every register unit of `preg` with `vreg`'s interval. The
  /// caller (the driver, §4.5) is responsible for having already confirmed
  /// `check` returned `Free`.
  pub fn assign(&mut self, units: &[RegUnit], vreg: VReg, interval: LiveInterval) {
    for &unit in units {
      self.occupants.entry(unit).or_insert_with(Vec::new).push((vreg, interval.clone()));
    }
  }

  /// Vacates every register unit of `preg` previously occupied by `vreg`,
  /// regardless of which interval it was checked in under.
  pub fn unassign(&mut self, units: &[RegUnit], vreg: VReg) {
    for &unit in units {
      if let Some(occ) = self.occupants.get_mut(&unit) {
        occ.retain(|(v, _)| *v != vreg);
      }
    }
  }
}
