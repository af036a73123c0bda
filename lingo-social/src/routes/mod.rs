pub mod blocks;
pub mod comments;
pub mod discover;
pub mod friends;
pub mod health;
pub mod posts;
pub mod profile;
pub mod uploads;
