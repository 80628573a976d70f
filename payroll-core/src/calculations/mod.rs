//! PCB calculation modules.
//!
//! Rounding helpers live in [`common`], relief capping in [`reliefs`], the
//! EPF cap allocation in [`epf`], and the engine itself in [`pcb`].

pub mod batch;
pub mod common;
pub mod epf;
pub mod pcb;
pub mod reliefs;

pub use batch::{PayrollOutcome, PayrollRequest, compute_batch};
pub use epf::{EpfReliefAllocation, allocate_epf_relief};
pub use pcb::{DEFAULT_NON_RESIDENT_RATE, PcbBreakdown, PcbCalculator, PcbError, compute_monthly_pcb};
pub use reliefs::{AppliedReliefs, ReliefOutcome, apply_relief_caps, apply_reliefs, rebate_for};
