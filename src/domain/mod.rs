// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing what the system
// scores, stores and reports.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only structs, enums, traits and closed-form maths
//
// The neural signal reaches this layer only through the
// AnomalySource trait, so every instrument can be scored
// and tested without a model on disk.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Error taxonomy shared by every layer
pub mod error;

// Instrument definitions: weights, intercepts, answer rules
pub mod instrument;

// Requests, outcomes and persisted results of an assessment
pub mod assessment;

// The parameterised hybrid risk scorer
pub mod scoring;

// Training progress shared between the trainer and status queries
pub mod training;

// Community posts and comments
pub mod community;

// Core abstractions (traits) that other layers implement
pub mod traits;
