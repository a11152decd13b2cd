pub mod post;
pub mod resource;
pub mod session;
pub mod status;
pub mod upvote;
pub mod user;
