//! Error surface. §7 distinguishes four error kinds; only two of them are
//! ever returned as `Err` from this crate's public API — "MIP-not-usable"
//! is a silent, recovered transition (see `driver::AllocationDriver`), and
//! "delegate contract violations" are debug-only assertions (§7 kind 4).

use crate::data_structures::VReg;
use std::fmt;

/// §7 kind 1 and kind 3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
  /// The `mip` feature is disabled, but the caller asked to use the MIP
  /// path anyway (e.g. explicitly via `AllocationDriver::with_mip`).
  ConfigMissing,
  /// A non-spillable virtual register had no feasible physical register in
  /// the fallback path. The original propagates this as the sentinel
  /// physreg `~0`; here it is a typed variant instead, but callers that
  /// need the legacy sentinel can still get it via `AllocError::sentinel`.
  Unallocatable { vreg: VReg },
}

impl AllocError {
  /// The legacy "fatal allocation error" sentinel from §7 kind 3, preserved
  /// for hosts that still expect a magic physreg value instead of an `Err`.
  pub const SENTINEL_PHYS_REG: u32 = !0u32;
}

impl fmt::Display for AllocError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      AllocError::ConfigMissing => {
        write!(f, "MIP register allocator requested but the `mip` solver backend is not compiled in")
      }
      AllocError::Unallocatable { vreg } => {
        write!(f, "{:?} is not spillable and has no feasible physical register", vreg)
      }
    }
  }
}

impl std::error::Error for AllocError {}
