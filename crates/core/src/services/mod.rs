//! Business logic services.

#![allow(missing_docs)]

pub mod content;
pub mod reaction;
pub mod storage_cleanup;
pub mod user;

pub use content::{
    AudioFile, ContentItem, ContentService, CreateCommentInput, CreatePostInput,
    UploadBeatInput, UploadRecordingInput,
};
pub use reaction::{ReactionService, ReactionStatus, ToggleOutcome};
pub use storage_cleanup::{RetryConfig, StorageCleanup};
pub use user::UserService;
