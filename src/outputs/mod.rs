//! Output writers for the two result tables.
//!
//! # Submodules
//!
//! - [`csv`]: `hasil_semua_portal.csv` (every article) and `hasil_ekonomi.csv`
//!   (target class only)
//! - [`json`]: both tables in one `{date}.json` file
//!
//! # Output Structure
//!
//! ```text
//! csv_output_dir/
//! ├── hasil_semua_portal.csv
//! └── hasil_ekonomi.csv
//!
//! json_output_dir/
//! └── 2024-03-12.json
//! ```

pub mod csv;
pub mod json;
