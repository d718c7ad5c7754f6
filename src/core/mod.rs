//! Core data types for the comparison matrix.
//!
//! - [`call`]: Classification of single-byte base calls
//! - [`contig`]: Contig name parsing and index entries
//! - [`chunk`]: One bounded, aligned slice of reference, mask, and sample bytes
//! - [`position`]: The per-site analysis record written to the matrix
//! - [`stats`]: Per-sample and per-contig counters
//!
//! ## Calls
//!
//! | Call | Meaning |
//! |------|---------|
//! | A/C/G/T | Clean base |
//! | N | Any base; not called |
//! | X | No data (sample shorter than reference, or contig missing) |
//! | other letters | Degenerate call (called, but ambiguous) |

pub mod call;
pub mod chunk;
pub mod contig;
pub mod position;
pub mod stats;
