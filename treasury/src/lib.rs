//! Treasury forensic guard.
//!
//! Watches for abnormal failure patterns and, once enough guardians agree,
//! flips the forensic switch. While the switch is active the protected
//! reserve can be redirected to the registered backup principals or
//! withdrawn to one of them.
//!
//! State machine:
//!
//! ```text
//!   INACTIVE ──(approvals ≥ required, cooldown elapsed)──▶ ACTIVE
//!   ACTIVE ──(owner deactivates)──▶ INACTIVE
//! ```
//!
//! Approvals come from two sources that share one set: guardians calling
//! [`ForensicGuard::approve_forensic_switch`], and the failure threshold,
//! which grants one approval on behalf of every active guardian. The second
//! path can activate the switch with no guardian approving explicitly; each
//! auto-granted approval is tracked separately and logged at `warn`.

pub mod distribution;
pub mod error;
pub mod guard;
pub mod params;
pub mod state;

pub use distribution::split_evenly;
pub use error::ForensicError;
pub use guard::ForensicGuard;
pub use params::{ForensicParams, MIN_BACKUPS};
pub use state::{BackupPrincipal, ForensicState};
