// ============================================================
// Layer 6 — Post Store
// ============================================================
// Community posts and their comments in a single JSON file:
//
//   data/posts.json
//     { next_post_id, next_comment_id, posts: [Post { comments }] }
//
// Every operation is read-modify-write under one mutex, and
// the file is replaced atomically (temp file + rename).
// Listing returns posts newest first with comments oldest first.

use std::{
    fs,
    io::Write,
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::community::{Comment, Post};
use crate::domain::error::PersistenceError;
use crate::domain::traits::PostStore;

pub const POSTS_FILE: &str = "posts.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PostFile {
    next_post_id:    i64,
    next_comment_id: i64,
    posts:           Vec<Post>,
}

pub struct JsonPostStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonPostStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { path: dir.into().join(POSTS_FILE), lock: Mutex::new(()) }
    }

    fn read(&self) -> Result<PostFile, PersistenceError> {
        if !self.path.exists() {
            return Ok(PostFile::default());
        }
        Ok(serde_json::from_slice(&fs::read(&self.path)?)?)
    }

    fn write(&self, file: &PostFile) -> Result<(), PersistenceError> {
        let dir = self.path.parent().map(PathBuf::from).unwrap_or_default();
        fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(file)?)?;
        tmp.persist(&self.path).map_err(|e| PersistenceError::Io(e.error))?;
        Ok(())
    }

    /// Run `f` against the file contents and save the result.
    fn modify<T>(
        &self,
        f: impl FnOnce(&mut PostFile) -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = self.read()?;
        let value = f(&mut file)?;
        self.write(&file)?;
        Ok(value)
    }
}

impl PostStore for JsonPostStore {
    fn create_post(&self, space: &str, text: &str, emotion: &str) -> Result<Post, PersistenceError> {
        self.modify(|file| {
            file.next_post_id += 1;
            let post = Post {
                id:         file.next_post_id,
                space:      space.to_string(),
                text:       text.to_string(),
                emotion:    emotion.to_string(),
                created_at: Utc::now(),
                comments:   Vec::new(),
            };
            file.posts.push(post.clone());
            tracing::debug!("Created post {} in '{}'", post.id, space);
            Ok(post)
        })
    }

    fn add_comment(&self, post_id: i64, text: &str, emotion: &str) -> Result<Comment, PersistenceError> {
        self.modify(|file| {
            let post = file
                .posts
                .iter_mut()
                .find(|p| p.id == post_id)
                .ok_or(PersistenceError::UnknownPost(post_id))?;
            file.next_comment_id += 1;
            let comment = Comment {
                id:         file.next_comment_id,
                post_id,
                text:       text.to_string(),
                emotion:    emotion.to_string(),
                created_at: Utc::now(),
            };
            post.comments.push(comment.clone());
            Ok(comment)
        })
    }

    fn posts_in_space(&self, space: &str) -> Result<Vec<Post>, PersistenceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut posts: Vec<Post> = self
            .read()?
            .posts
            .into_iter()
            .filter(|p| p.space == space)
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        for post in posts.iter_mut() {
            post.comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        }
        Ok(posts)
    }

    fn delete_post(&self, post_id: i64) -> Result<(), PersistenceError> {
        self.modify(|file| {
            let before = file.posts.len();
            file.posts.retain(|p| p.id != post_id);
            if file.posts.len() == before {
                return Err(PersistenceError::UnknownPost(post_id));
            }
            Ok(())
        })
    }

    fn delete_comment(&self, comment_id: i64) -> Result<(), PersistenceError> {
        self.modify(|file| {
            for post in file.posts.iter_mut() {
                if let Some(pos) = post.comments.iter().position(|c| c.id == comment_id) {
                    post.comments.remove(pos);
                    return Ok(());
                }
            }
            Err(PersistenceError::UnknownComment(comment_id))
        })
    }
}
