// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches Burn modules, optimizers or autodiff:
//
//   model.rs      — transformer encoder + regression head
//                   predicting a markdown cell's normalised rank
//
//   scheduler.rs  — linear warmup / linear decay learning rate
//
//   trainer.rs    — per-fold training loop with gradient
//                   accumulation and per-epoch checkpoints
//
//   inferencer.rs — validation predictions on the inner
//                   (non-autodiff) backend

/// Markdown ranking model architecture
pub mod model;

/// Learning-rate schedule
pub mod scheduler;

/// Fold training loop
pub mod trainer;

/// Validation inference
pub mod inferencer;
