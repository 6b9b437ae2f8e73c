//! Database entities.

#![allow(missing_docs)]

pub mod beat;
pub mod comment;
pub mod post;
pub mod reaction;
pub mod recording;
pub mod user;

pub use beat::Entity as Beat;
pub use comment::Entity as Comment;
pub use post::Entity as Post;
pub use reaction::{ContentKind, Entity as Reaction};
pub use recording::Entity as Recording;
pub use user::Entity as User;
