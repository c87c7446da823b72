// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the files on disk and GPU-ready batches:
//
//   CSV / JSON files
//       │
//       ▼
//   loader          → reads cells, features and orders
//       │
//       ▼
//   preprocessor    → drops incomplete markdown rows
//       │
//       ▼
//   splitter        → K-fold partition of the training rows
//       │
//       ▼
//   MarkdownDataset → tokenises a cell plus code context
//       │
//       ▼
//   BatchedDataset  → groups samples into whole batches
//       │
//       ▼
//   MarkdownBatcher → stacks a batch into tensors
//       │
//       ▼
//   DataLoader      → worker threads feed the training loop

/// Reads the CSV tables and the features document
pub mod loader;

/// Filters incomplete markdown rows
pub mod preprocessor;

/// Implements Burn's Dataset trait for markdown cells
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded K-fold cross-validation splitter
pub mod splitter;
