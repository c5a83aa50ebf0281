//! Sheet model constants and width presets.

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Minimum final width for auto-sized columns.
pub const N_WIDTH_AUTO_MIN: usize = 8;
/// Maximum final width for auto-sized columns.
pub const N_WIDTH_AUTO_MAX: usize = 60;
/// Width padding added after auto-size inference.
pub const N_WIDTH_AUTO_PAD: usize = 2;
