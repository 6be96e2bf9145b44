//! # Snapshot Support
//!
//! Stable views of a built model for tests and tooling.
//!
//! - **`normalize`**: converts a model to a serializable `Snap` keyed by
//!   structural keys rather than arena ids
//! - **`outline`**: an indented text dump, one line per object
//! - **`invariants`**: panicking checks (zettel partition their clips,
//!   keys nest, sequence members point back at their sequence)

pub mod invariants;
pub mod normalize;
pub mod outline;

pub use invariants::check as invariants;
pub use normalize::{Snap, normalize};
pub use outline::outline;
