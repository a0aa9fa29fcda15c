// ============================================================
// Layer 2 — Application
// ============================================================
// Coordinates the other layers: sets up the task's dictionaries,
// builds or restores the model, and resolves names to presets.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

/// The bert_translation task
pub mod task;

/// Model, architecture and task registries
pub mod registry;
