pub mod accounts;
pub mod feed;
pub mod posts;
pub mod upvote;
