//! Resource declarations for the blog.

mod comments;
mod posts;
mod users;
pub mod validators;

pub use comments::comments;
pub use posts::{posts, PublishedOnly, Timestamped};
pub use users::users;
