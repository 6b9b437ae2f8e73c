//! Database repositories.

pub mod beat;
pub mod content;
pub mod counter;
pub mod post;
pub mod reaction;
pub mod recording;
pub mod user;

pub use beat::BeatRepository;
pub use content::ContentRepository;
pub use counter::{ContentCounters, CounterRepository};
pub use post::PostRepository;
pub use reaction::ReactionRepository;
pub use recording::RecordingRepository;
pub use user::UserRepository;
