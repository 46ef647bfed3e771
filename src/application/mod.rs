// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one command of the CLI:
//
//   split           — labelled csv → data_0 … data_{k-1}
//   vocab           — dump the side-channel vocabularies
//   train           — fine-tune one fold
//   predict         — best checkpoint → sub.csv
//   cross-validate  — train + predict every fold, then combine
//   combine         — average the fold submissions
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Fold files, vocabularies and encoders shared by the use cases
pub mod fold;

pub mod split_use_case;
pub mod vocab_use_case;

// The training workflow
pub mod train_use_case;

// Checkpoint → test probabilities
pub mod predict_use_case;

pub mod combine_use_case;
pub mod cross_validate_use_case;
