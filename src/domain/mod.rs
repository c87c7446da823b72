// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and rules for notebooks and their cells.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums and pure functions
//
// The scoring maths lives here too: merging predicted markdown
// ranks with known code ranks, and the Kendall tau metric.

// Cells, notebook features and ground-truth orders
pub mod cell;

// Percentile ranks and predicted notebook orderings
pub mod ranking;

// Inversion-count rank correlation
pub mod kendall;
