// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no model math and no file
// formats. The use case tells the data, ml and infra layers
// what to do, in which order, with which configuration.

// Run configuration: file, overrides, validation
pub mod config;

// The cross-validated training workflow
pub mod train_use_case;
