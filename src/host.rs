//! §6 "External interfaces": the capabilities the allocator consumes from
//! its host compiler, expressed as narrow traits instead of concrete LLVM
//! analysis types. Each trait below corresponds to one bullet under
//! "Required inputs" in the spec.

use crate::data_structures::{AllocHint, LiveInterval, PReg, RegUnit, VReg};

/// *Liveness DB*: `interval(vreg) -> LiveInterval`, overlap test, weight.
///
/// The overlap test and weight are methods on `LiveInterval` itself (see
/// `data_structures.rs`); this trait is just the lookup from identity to
/// interval.
pub trait LivenessInfo {
  fn interval(&self, vreg: VReg) -> &LiveInterval;
}

/// *VirtRegMap*: has-physreg, set-physreg, resolve-hint.
pub trait VirtRegMap {
  fn has_phys(&self, vreg: VReg) -> bool;
  fn phys(&self, vreg: VReg) -> Option<PReg>;
  fn set_phys(&mut self, vreg: VReg, preg: PReg);
  fn clear_phys(&mut self, vreg: VReg);

  /// Resolve a VReg's hint chain to a concrete PReg, if one is currently
  /// known. A hint that points at another VReg is only useful once that
  /// VReg itself has an assignment; unresolved hints are `None`.
  fn resolve_hint(&self, vreg: VReg) -> Option<PReg> {
    None
  }
}

/// *Target info*: `allocation_order(vreg)`, `reg_units(preg)`,
/// `should_allocate(vreg)`, plus the §4.5 post-allocation hook.
pub trait TargetInfo {
  /// An ordered, filtered sequence of candidate PRegs for `vreg`, already
  /// reordered so that a resolved hint (if any) comes first. See §3
  /// "Allocation order".
  fn allocation_order(&self, vreg: VReg) -> &[PReg];

  /// The register units a PReg expands to, for aliasing-aware
  /// interference (§3 "Physical register").
  fn reg_units(&self, preg: PReg) -> &[RegUnit];

  /// Whether `vreg` should be allocated at all (e.g. excludes unused or
  /// debug-only virtual registers). Mirrors `MRI->reg_nodbg_empty` /
  /// `shouldAllocateRegister` in the reference implementation.
  fn should_allocate(&self, vreg: VReg) -> bool {
    true
  }

  /// Whether `vreg` may be spilled. A non-spillable VReg (e.g. one pinned
  /// to a register by an ABI constraint the target enforces elsewhere)
  /// never enters the spill set and never receives an "impossible"
  /// decision gracefully: if no PReg fits, allocation fails fatally for
  /// this function (§3 invariants, §4.3, §4.4).
  fn is_spillable(&self, vreg: VReg) -> bool {
    true
  }

  fn hint(&self, vreg: VReg) -> Option<AllocHint> {
    None
  }

  /// §4.5 "Post-loop": copy elimination / rewrite hook run once after the
  /// driver loop drains. Default no-op so hosts with nothing to do here
  /// need not implement it (§10.6).
  fn post_optimization(&mut self) {}
}

/// A scoped handle through which the spiller mutates allocator-visible
/// state (§3 "Range edit", §4.5 "Edit-delegate callbacks"). The allocator
/// implements this trait; the spiller is handed a `&mut dyn RangeEditDelegate`
/// for the duration of each spill call and must not retain it past that
/// call (§9 "Back-reference cycles").
pub trait RangeEditDelegate {
  /// The VReg is about to be deleted. Returns `true` iff the VReg was
  /// assigned and has just been unassigned from the matrix (§4.5).
  fn can_erase(&mut self, vreg: VReg) -> bool;

  /// The VReg's interval shrank in place; if it was assigned, it is
  /// unassigned and re-enqueued (§4.5).
  fn will_shrink(&mut self, vreg: VReg);
}

/// The external spiller. `spill` may create new, shorter VRegs (appended to
/// `split_vregs`) and calls back into the `RangeEditDelegate` as it edits
/// intervals (§4.5).
pub trait Spiller {
  fn spill(
    &mut self, vreg: VReg, delegate: &mut dyn RangeEditDelegate,
    split_vregs: &mut Vec<VReg>,
  );
}

/// Constructs an inline spiller given the host's liveness/live-stacks/
/// dom-tree/block-frequency analyses (§6 "Spiller factory"). Those
/// analyses are themselves out of scope (§1), so the factory is opaque: it
/// just has to produce *some* `Spiller`.
pub trait SpillerFactory {
  fn make_spiller(&self) -> Box<dyn Spiller>;
}
