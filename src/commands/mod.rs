//! # CLI Command Implementations
//!
//! One module per subcommand. Each has an `Args` struct derived with `clap`
//! and an `execute` function that calls into the `gitdir` library.

pub mod sync;
pub mod validate;
