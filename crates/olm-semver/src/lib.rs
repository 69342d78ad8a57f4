//! Semantic versions and version-range grammars.
//!
//! Two range grammars are provided because callers pick one depending on
//! context:
//!
//! - [`VersionRange`]: the user-facing comparator grammar (`>=1.2, <2`,
//!   `1.x || ~2.1`, `v1.2.*`, `1.0 - 1.4.5`).
//! - [`CaretRange`]: a stricter grammar over full versions used for upgrade
//!   constraints and declared bundle dependencies (`^1.2.3`, `>=1.0.0 <2.0.0`).
//!
//! Both implement [`VersionConstraint`].

pub mod constraint;
mod caret;
mod error;
mod range;
mod version;

pub use caret::CaretRange;
pub use constraint::{Comparator, Operator, VersionConstraint};
pub use error::VersionError;
pub use range::VersionRange;
pub use version::{Identifier, Version};
