pub mod catalog_list;
pub mod detail;
pub mod episode_list;
pub mod header;
