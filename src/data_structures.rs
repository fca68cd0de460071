/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Data structures shared by the whole crate: dense identities for virtual
//! and physical registers, register classes, and live intervals.

use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::fmt;

//=============================================================================
// Maps

// NOTE: plain HashMap is nondeterministic, even in a single-threaded
// scenario, which can make debugging code that uses it really confusing. So
// we use FxHashMap instead, as it *is* deterministic, and, allegedly, faster
// too. Every map the allocator keeps between a function entry and its exit
// goes through this alias so two runs over the same input always visit
// entries in the same order.
pub type Map<K, V> = FxHashMap<K, V>;

//=============================================================================
// Dense identities
//
// Each entity gets a distinct newtype wrapping a u32, generated by the macro
// below. This gives cheap Copy equality, a debug format tagged with the
// entity's printing prefix, and a guarantee that indices from one kind of
// entity can never be silently used to index a vector of another.

macro_rules! generate_index_type {
  ($TypeIx:ident, $PrintingPrefix:expr) => {
    #[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
    pub struct $TypeIx(u32);
    impl $TypeIx {
      #[allow(dead_code)]
      pub fn new(n: u32) -> Self {
        Self(n)
      }
      #[allow(dead_code)]
      pub fn index(self) -> usize {
        self.0 as usize
      }
      #[allow(dead_code)]
      pub fn get(self) -> u32 {
        self.0
      }
    }
    impl fmt::Debug for $TypeIx {
      fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}{}", $PrintingPrefix, self.0)
      }
    }
    impl From<u32> for $TypeIx {
      fn from(n: u32) -> Self {
        Self(n)
      }
    }
  };
}

generate_index_type!(VReg, "v");
generate_index_type!(PReg, "p");
generate_index_type!(RegUnit, "u");

/// A register class is an opaque, target-supplied dense index. The set of
/// classes and their cardinality is a property of the target description
/// (out of scope, see spec §1), not of the allocator, so it is not a fixed
/// enum here.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegClass(u16);
impl RegClass {
  pub fn new(n: u16) -> Self {
    RegClass(n)
  }
  pub fn index(self) -> usize {
    self.0 as usize
  }
}
impl fmt::Debug for RegClass {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    write!(fmt, "class{}", self.0)
  }
}

//=============================================================================
// Code positions and live intervals

/// A position in the instruction stream. Dense, monotonically increasing
/// within one function; meaningless across functions.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CodePosition(u32);
impl CodePosition {
  pub fn new(n: u32) -> Self {
    CodePosition(n)
  }
  pub fn get(self) -> u32 {
    self.0
  }
}
impl fmt::Debug for CodePosition {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    write!(fmt, "@{}", self.0)
  }
}

/// A single half-open `[start, end)` range within a live interval's range
/// union. Ranges within one interval never overlap and are kept sorted by
/// `start`, mirroring the `RangeFrag` / `SortedRangeFragIxs` discipline the
/// reference implementation uses for its own range unions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CodeRange {
  pub start: CodePosition,
  pub end: CodePosition,
}

impl CodeRange {
  pub fn new(start: CodePosition, end: CodePosition) -> Self {
    debug_assert!(start < end, "CodeRange::new: empty or inverted range");
    CodeRange { start, end }
  }

  fn overlaps(&self, other: &CodeRange) -> bool {
    self.start < other.end && other.start < self.end
  }
}

/// A union of disjoint, sorted `CodeRange`s plus the spill weight of the
/// register whose liveness it describes. This is the allocator's view of a
/// virtual register's live range: §3 calls it the "live interval".
#[derive(Clone, Debug)]
pub struct LiveInterval {
  ranges: Vec<CodeRange>,
  weight: f32,
}

impl LiveInterval {
  pub fn new(mut ranges: Vec<CodeRange>, weight: f32) -> Self {
    ranges.sort_unstable_by_key(|r| r.start);
    debug_assert!(
      ranges.windows(2).all(|w| w[0].end <= w[1].start),
      "LiveInterval::new: ranges must be sorted and non-overlapping"
    );
    LiveInterval { ranges, weight }
  }

  pub fn weight(&self) -> f32 {
    self.weight
  }

  pub fn ranges(&self) -> &[CodeRange] {
    &self.ranges
  }

  pub fn is_empty(&self) -> bool {
    self.ranges.is_empty()
  }

  /// Merge-scan over both sorted range lists; this is the same two-pointer
  /// idiom `cmp_range_frags`/`SortedRangeFragIxs::can_add` use in the
  /// reference implementation, specialized to a yes/no overlap test instead
  /// of a full merge.
  pub fn overlaps(&self, other: &LiveInterval) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < self.ranges.len() && j < other.ranges.len() {
      let a = &self.ranges[i];
      let b = &other.ranges[j];
      if a.overlaps(b) {
        return true;
      }
      if a.end <= b.start {
        i += 1;
      } else {
        j += 1;
      }
    }
    false
  }
}

//=============================================================================
// Allocation hints

/// §3: "an optional allocation hint - either another VReg (follow its
/// assignment) or a concrete physreg."
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocHint {
  FollowVReg(VReg),
  Phys(PReg),
}

//=============================================================================
// Ordering helper shared by the priority queue and the MIP's deterministic
// tie-break: weight first (as an f32, compared via total_cmp so NaN can
// never violate the heap invariant), then dense id as the tie-break.

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WeightedVReg {
  pub weight: f32,
  pub vreg: VReg,
}

impl Eq for WeightedVReg {}

impl Ord for WeightedVReg {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .weight
      .total_cmp(&other.weight)
      .then_with(|| other.vreg.cmp(&self.vreg))
  }
}

impl PartialOrd for WeightedVReg {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}
