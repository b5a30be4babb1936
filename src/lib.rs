pub mod column_map;
pub mod config;
pub mod html_table;
pub mod merge;
pub mod normalize;
pub mod page_extractor;
pub mod pagination;
pub mod report;
pub mod row_parser;
pub mod schema;
