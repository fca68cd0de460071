//! C1: priority queue. Orders pending virtual registers by descending spill
//! weight, breaking ties by ascending VReg id so that two runs over the same
//! input always dequeue in the same order (§3 "Allocation order", §4.1).

use crate::data_structures::{VReg, WeightedVReg};
use std::collections::BinaryHeap;

/// A max-heap of `(weight, vreg)` pairs. `std::collections::BinaryHeap` is a
/// max-heap already, so `WeightedVReg`'s `Ord` impl (heaviest first, then
/// lowest id) gives the exact priority the reference implementation's
/// `CompSpillWeight`-ordered `std::priority_queue` provides.
#[derive(Default)]
pub struct PriorityQueue {
  heap: BinaryHeap<WeightedVReg>,
}

impl PriorityQueue {
  pub fn new() -> Self {
    PriorityQueue { heap: BinaryHeap::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.heap.is_empty()
  }

  pub fn len(&self) -> usize {
    self.heap.len()
  }

  /// Enqueue `vreg` at `weight`. Corresponds to `enqueueImpl` in the
  /// reference pass: the allocator calls this once per initial virtual
  /// register, and again for every split/spill product the fallback or the
  /// edit delegate produces.
  pub fn push(&mut self, vreg: VReg, weight: f32) {
    self.heap.push(WeightedVReg { weight, vreg });
  }

  /// Dequeue the highest-priority VReg, if any. Corresponds to `dequeue`.
  pub fn pop(&mut self) -> Option<VReg> {
    self.heap.pop().map(|w| w.vreg)
  }
}
