mod client;

pub use client::{GitLabClient, MAX_PAGE_SIZE};
