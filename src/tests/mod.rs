//! Crate-level integration tests.
//!
//! Unit tests live next to their modules; these files exercise the
//! public API end to end, from expression construction through
//! compilation, optimization, execution, and decompilation.
