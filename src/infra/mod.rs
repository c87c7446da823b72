// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by more than one layer:
//
//   checkpoint.rs      — per-epoch model / optimizer / scheduler
//                        state and the resolved run config
//
//   tokenizer_store.rs — loads the pretrained tokenizer from the
//                        model directory and resolves its
//                        special token ids
//
//   device.rs          — backend choice and compute device list
//
//   metrics.rs         — per-epoch CSV log

/// Training state persistence
pub mod checkpoint;

/// Pretrained tokenizer loading
pub mod tokenizer_store;

/// Backend and device selection
pub mod device;

/// Training metrics CSV logger
pub mod metrics;
