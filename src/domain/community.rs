// ============================================================
// Layer 3 — Community Posts
// ============================================================
// Posts live in a named "space"; each post and comment is
// tagged with the emotion label predicted for its text
// ("neutral" when no model is available).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SPACE:   &str = "Community Support";
pub const NEUTRAL_EMOTION: &str = "neutral";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id:         i64,
    pub post_id:    i64,
    pub text:       String,
    pub emotion:    String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id:         i64,
    pub space:      String,
    pub text:       String,
    pub emotion:    String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comments:   Vec<Comment>,
}
