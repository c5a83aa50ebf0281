//! Export pipeline defaults.

/// Records fetched per batch when iterating a batch query.
pub const N_SIZE_BATCH_DEFAULT: usize = 100;
/// Sheet row from which rendering starts (rows are one-based).
pub const N_ROW_START_DEFAULT: usize = 1;
/// Default header text of serial (row number) columns.
pub const C_HEADER_SERIAL_DEFAULT: &str = "#";
/// Decimal digits used by the default decimal display format.
pub const N_DIGITS_DECIMAL_DEFAULT: usize = 4;
/// Decimal digits used by the currency display format.
pub const N_DIGITS_CURRENCY_DEFAULT: usize = 2;
