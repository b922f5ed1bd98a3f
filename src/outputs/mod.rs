//! Report writers.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── 08-15-00.json
//!     └── 14-30-12.json
//! ```

pub mod json;
