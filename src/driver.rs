//! C5: the allocation driver, which owns the per-function run: seeding the
//! queue, attempting the MIP path once, falling back to greedy placement,
//! and servicing the spiller's edit callbacks. Mirrors
//! `RegAllocILP.cpp::{runOnMachineFunction, selectOrSplit,
//! LRE_CanEraseVirtReg, LRE_WillShrinkVirtReg, releaseMemory}`.

use crate::data_structures::{PReg, RegUnit, VReg};
use crate::error::AllocError;
use crate::greedy::{select_or_split_fallback, FallbackResult};
use crate::host::{LivenessInfo, RangeEditDelegate, Spiller, SpillerFactory, TargetInfo, VirtRegMap};
use crate::matrix::LiveRegMatrix;
use crate::queue::PriorityQueue;
use log::debug;

/// Drives one function's worth of allocation. Generic over the host's
/// concrete liveness/target/vreg-map types so the allocator never needs to
/// box or dynamic-dispatch the hot-path collaborators (§6 "narrow
/// interfaces" is about API shape, not necessarily dynamic dispatch).
pub struct AllocationDriver<'a, L, V, T> {
  liveness: &'a L,
  vreg_map: &'a mut V,
  target: &'a mut T,
  matrix: LiveRegMatrix,
  queue: PriorityQueue,
  spiller: Box<dyn Spiller>,
  split_vregs: Vec<VReg>,

  /// VRegs the MIP solve placed in its spill set (`s[v] = 1`), waiting for
  /// `run` to invoke the spiller on them after `try_mip_once` returns.
  pending_mip_spills: Vec<VReg>,

  /// §4.3/§4.4: the MIP path is attempted at most once per function, same
  /// as the reference pass's `ILPAttempted` flag. `ilp_solved` records
  /// whether it succeeded, purely for diagnostics.
  ilp_attempted: bool,
  ilp_solved: bool,

  /// Whether this run should even try the MIP path at all. Distinct from
  /// `ilp_attempted`: set once at construction, from whether the `mip`
  /// feature is compiled in and the caller asked for it.
  use_mip: bool,
}

impl<'a, L, V, T> AllocationDriver<'a, L, V, T>
where
  L: LivenessInfo,
  V: VirtRegMap,
  T: TargetInfo,
{
  pub fn new(
    liveness: &'a L, vreg_map: &'a mut V, target: &'a mut T, spiller_factory: &dyn SpillerFactory,
  ) -> Self {
    AllocationDriver {
      liveness,
      vreg_map,
      target,
      matrix: LiveRegMatrix::new(),
      queue: PriorityQueue::new(),
      spiller: spiller_factory.make_spiller(),
      split_vregs: Vec::new(),
      pending_mip_spills: Vec::new(),
      ilp_attempted: false,
      ilp_solved: false,
      use_mip: cfg!(feature = "mip"),
    }
  }

  /// Forces the MIP path on or off regardless of the `mip` feature; if
  /// forced on while the feature is compiled out, `run` returns
  /// `AllocError::ConfigMissing` instead of silently falling back (§7 kind 1).
  pub fn with_mip(mut self, use_mip: bool) -> Self {
    self.use_mip = use_mip;
    self
  }

  pub fn reserve_fixed(&mut self, unit: RegUnit) {
    self.matrix.reserve_fixed(unit);
  }

  /// Seeds `vreg` as already resident at `preg` before the main loop starts,
  /// occupying the matrix over `vreg`'s live range without ever placing it
  /// in the queue. Unlike `reserve_fixed`, this is a normal, evictable
  /// virtual occupant: a later VReg with a heavier weight can still displace
  /// it, and a VReg whose interval doesn't overlap it can still share its
  /// register. Useful for values a host has already bound to a physreg
  /// outside this run (e.g. ABI-fixed argument registers) that the driver
  /// should still treat as ordinary interference sources.
  pub fn preassign(&mut self, vreg: VReg, preg: PReg) {
    let units = self.target.reg_units(preg);
    self.matrix.assign(units, vreg, self.liveness.interval(vreg).clone());
    self.vreg_map.set_phys(vreg, preg);
  }

  pub fn ilp_solved(&self) -> bool {
    self.ilp_solved
  }

  /// The VRegs produced by splitting/spilling over the course of `run`,
  /// for hosts that need to know which VRegs are new (§4.5, §6).
  pub fn split_vregs(&self) -> &[VReg] {
    &self.split_vregs
  }

  /// §4.5 "Main loop": seed the queue, try the MIP model once, then drain
  /// the queue through the greedy fallback (spilling/splitting as needed)
  /// until nothing is pending. Runs the target's post-optimization hook
  /// once at the end.
  pub fn run(&mut self, initial: &[VReg]) -> Result<(), AllocError> {
    if self.use_mip && !cfg!(feature = "mip") {
      return Err(AllocError::ConfigMissing);
    }

    for &vreg in initial {
      if self.target.should_allocate(vreg) {
        self.queue.push(vreg, self.liveness.interval(vreg).weight());
      }
    }

    self.try_mip_once();

    let mip_spills = std::mem::take(&mut self.pending_mip_spills);
    for vreg in mip_spills {
      self.spill_vreg(vreg)?;
    }

    while let Some(vreg) = self.queue.pop() {
      if self.vreg_map.has_phys(vreg) {
        continue;
      }
      self.place(vreg)?;
    }

    self.target.post_optimization();
    Ok(())
  }

  #[cfg(feature = "mip")]
  fn try_mip_once(&mut self) {
    if self.ilp_attempted || !self.use_mip {
      return;
    }
    self.ilp_attempted = true;

    let mut pending = Vec::new();
    while let Some(v) = self.queue.pop() {
      pending.push(v);
    }

    match crate::mip::solve_with_mip(&pending, self.liveness, &*self.target, &*self.vreg_map, &self.matrix) {
      Ok(Some(solution)) => {
        // §4.5 decide(v): consult `assigned` first, then `spill_set`; a
        // VReg in neither (solver numerical issues) would be a bug in
        // `solve_with_mip` itself, since it always rounds to one or the
        // other once `Ok(Some(_))` is returned.
        for &vreg in &pending {
          if let Some(preg) = solution.phys(vreg) {
            let units = self.target.reg_units(preg);
            self.matrix.assign(units, vreg, self.liveness.interval(vreg).clone());
            self.vreg_map.set_phys(vreg, preg);
          }
        }
        self.ilp_solved = true;
        debug!("mip: allocation accepted for {} vregs", pending.len());
        self.pending_mip_spills = solution.spilled().to_vec();
      }
      Ok(None) => {
        debug!("mip: no model to solve, falling back to greedy");
        for vreg in pending {
          self.queue.push(vreg, self.liveness.interval(vreg).weight());
        }
      }
      Err(e) => {
        debug!("mip: solver failed ({}), falling back to greedy", e);
        for vreg in pending {
          self.queue.push(vreg, self.liveness.interval(vreg).weight());
        }
      }
    }
  }

  #[cfg(not(feature = "mip"))]
  fn try_mip_once(&mut self) {}

  /// §4.4/§4.5: one greedy placement attempt for `vreg`, possibly evicting
  /// occupants (each unassigned and then run through the spiller, same as a
  /// direct `MustSpill`, so an evicted interval's own split products get
  /// enqueued rather than the interval itself) or invoking the spiller on
  /// `vreg` directly.
  fn place(&mut self, vreg: VReg) -> Result<(), AllocError> {
    match select_or_split_fallback(vreg, &*self.target, self.liveness, &self.matrix) {
      FallbackResult::Assigned(preg) => {
        let units = self.target.reg_units(preg);
        self.matrix.assign(units, vreg, self.liveness.interval(vreg).clone());
        self.vreg_map.set_phys(vreg, preg);
        Ok(())
      }
      FallbackResult::AssignedWithEvictions { preg, evicted } => {
        let units = self.target.reg_units(preg).to_vec();
        for &v in &evicted {
          self.matrix.unassign(&units, v);
          self.vreg_map.clear_phys(v);
        }
        self.matrix.assign(&units, vreg, self.liveness.interval(vreg).clone());
        self.vreg_map.set_phys(vreg, preg);
        for v in evicted {
          self.spill_vreg(v)?;
        }
        Ok(())
      }
      FallbackResult::MustSpill => self.spill_vreg(vreg),
      FallbackResult::Fatal => Err(AllocError::Unallocatable { vreg }),
    }
  }

  /// Invokes the spiller on `vreg` (§4.4 step 3, and §4.5's handling of the
  /// MIP spill set), then re-enqueues whatever split products it produced.
  /// A spiller that produces no split and leaves `vreg` without a physreg
  /// has made no progress, which can only happen for a VReg the fallback
  /// already decided is genuinely unallocatable.
  fn spill_vreg(&mut self, vreg: VReg) -> Result<(), AllocError> {
    let mut split_vregs = Vec::new();
    let produced_phys = {
      let mut delegate =
        DriverDelegate { vreg_map: &mut *self.vreg_map, queue: &mut self.queue, liveness: self.liveness };
      self.spiller.spill(vreg, &mut delegate, &mut split_vregs);
      self.vreg_map.has_phys(vreg)
    };
    if split_vregs.is_empty() && !produced_phys {
      return Err(AllocError::Unallocatable { vreg });
    }
    for v in split_vregs {
      self.queue.push(v, self.liveness.interval(v).weight());
      self.split_vregs.push(v);
    }
    Ok(())
  }
}

/// The `RangeEditDelegate` the driver hands the spiller for the duration of
/// one `spill()` call, borrowing the driver's own matrix/vreg-map/queue.
/// This is the Rust expression of the reference pass's
/// `LRE_CanEraseVirtReg`/`LRE_WillShrinkVirtReg`, which are methods directly
/// on the allocator, passed to the spiller as a `LiveRangeEdit::Delegate*`.
struct DriverDelegate<'a, L, V> {
  vreg_map: &'a mut V,
  queue: &'a mut PriorityQueue,
  liveness: &'a L,
}

impl<'a, L: LivenessInfo, V: VirtRegMap> RangeEditDelegate for DriverDelegate<'a, L, V> {
  fn can_erase(&mut self, vreg: VReg) -> bool {
    if self.vreg_map.has_phys(vreg) {
      self.vreg_map.clear_phys(vreg);
      true
    } else {
      false
    }
  }

  fn will_shrink(&mut self, vreg: VReg) {
    if self.vreg_map.has_phys(vreg) {
      self.vreg_map.clear_phys(vreg);
    }
    self.queue.push(vreg, self.liveness.interval(vreg).weight());
  }
}
