// ============================================================
// Layer 2 — Community Use Case
// ============================================================
// Posts and comments, each tagged with the emotion label of its
// text at creation time.

use crate::application::analyze_use_case::AnalyzeUseCase;
use crate::domain::community::{Comment, Post};
use crate::domain::error::PersistenceError;
use crate::domain::traits::{EmotionSource, PostStore};

pub struct CommunityUseCase<'a> {
    store:    &'a dyn PostStore,
    analyzer: AnalyzeUseCase<'a>,
}

impl<'a> CommunityUseCase<'a> {
    pub fn new(store: &'a dyn PostStore, emotions: &'a dyn EmotionSource) -> Self {
        Self { store, analyzer: AnalyzeUseCase::new(emotions) }
    }

    pub fn create_post(&self, space: &str, text: &str) -> Result<Post, PersistenceError> {
        let emotion = self.analyzer.label_or_neutral(text).label;
        let post = self.store.create_post(space, text, &emotion)?;
        tracing::info!("Post {} created in '{}' ({})", post.id, post.space, post.emotion);
        Ok(post)
    }

    pub fn add_comment(&self, post_id: i64, text: &str) -> Result<Comment, PersistenceError> {
        let emotion = self.analyzer.label_or_neutral(text).label;
        self.store.add_comment(post_id, text, &emotion)
    }

    pub fn list(&self, space: &str) -> Result<Vec<Post>, PersistenceError> {
        self.store.posts_in_space(space)
    }

    pub fn delete_post(&self, post_id: i64) -> Result<(), PersistenceError> {
        self.store.delete_post(post_id)?;
        tracing::info!("Post {} deleted", post_id);
        Ok(())
    }

    pub fn delete_comment(&self, comment_id: i64) -> Result<(), PersistenceError> {
        self.store.delete_comment(comment_id)
    }
}
