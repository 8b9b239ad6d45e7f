//! Database models.

pub mod blog;
pub mod bookmark;
pub mod comment;
pub mod like;
pub mod user;

pub use blog::{Blog, BlogCard, CreateBlog, UpdateBlog};
pub use bookmark::{Bookmark, BookmarkedPost};
pub use comment::{Comment, CommentWithAuthor, CreateComment};
pub use like::Like;
pub use user::{CreateUser, User};
