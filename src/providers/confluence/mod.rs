mod client;

pub use client::ConfluenceClient;
