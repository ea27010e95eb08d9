pub mod client;
pub mod reader;

pub use client::{CrossrefClient, WorksPage, PAGE_SIZE};
pub use reader::read_raw_items;
