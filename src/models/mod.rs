pub mod courier;
pub mod earnings;
pub mod event;
pub mod job;
pub mod page;
