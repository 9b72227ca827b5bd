//! Output generation.
//!
//! - [`table`]: deduplicates collected articles and writes them as CSV, both
//!   for periodic checkpoints and for the final result
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── hotnewhiphop_articles.csv   # final table
//! ├── backup_page_13850.csv       # checkpoint taken after page 13850
//! └── backup_page_13900.csv
//! ```

pub mod table;
