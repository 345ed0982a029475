// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case wires domain logic to the collaborators it
// needs and owns one workflow:
//
//   assess     — score one instrument submission, store it
//   analyze    — emotion label for free text
//   community  — posts and comments tagged with emotions
//   train      — CSV → trained classifier → checkpoint
//   status     — training progress and model availability
//   dataset    — inspect the training CSV
//
// Rules for this layer:
//   - No model maths or tensor code
//   - No printing (that's Layer 1)
//   - Collaborators come in as traits or infra handles
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

pub mod assess_use_case;

pub mod analyze_use_case;

pub mod community_use_case;

// The training workflow
pub mod train_use_case;

pub mod status_use_case;

pub mod dataset_use_case;
