//! Output generation: markdown conversion, frontmatter, and files on disk.
//!
//! # Submodules
//!
//! - [`markdown`]: Converts cleaned body HTML to markdown and derives a summary
//! - [`frontmatter`]: Builds the ordered metadata block at the top of each file
//! - [`persist`]: Writes documents without ever replacing an existing file
//! - [`report`]: Writes the batch report as JSON
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── Hello-World.md                  # first save of a title
//! ├── Hello-World_20240305_090807.md  # same title, later run
//! └── Hello-World_20240305_090807_1.md
//! ```

pub mod frontmatter;
pub mod markdown;
pub mod persist;
pub mod report;
