//! Shared angle utilities for the Neloura coordinate overlay.
//!
//! `neloura-core` holds the small pieces of spherical bookkeeping that both
//! the WCS layer and the overlay layer need:
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`angle`] | RA wrapping, ±180 branch normalisation, longitude unwrapping, HMS/DMS formatting |
//! | [`constants`] | Unit conversion constants |
//! | [`test_helpers`] | `assert_close!` for float assertions in tests |
//!
//! All angles are in degrees unless a name says otherwise.

pub mod angle;
pub mod constants;

pub mod test_helpers;
