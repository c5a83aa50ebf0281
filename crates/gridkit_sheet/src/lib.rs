//! `gridkit_sheet`:
//! In-memory spreadsheet document model and format writers.
//!
//! - `conf`     : constants and width presets
//! - `spec`     : cell value/style/dimension/properties models
//! - `document` : workbook + worksheet object model
//! - `util`     : pure helper functions
//! - `writer`   : XLSX/CSV encoders and format resolution
pub mod conf;
pub mod document;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL};
pub use document::{SpecCell, SpecCellCoordinate, SpecCellRange, SpecDocument, SpecSheet};
pub use spec::{
    EnumBorderLine, EnumCellValue, EnumHorizontalAlign, EnumVerticalAlign, SheetError,
    SpecCellAlignment, SpecCellBorder, SpecCellFill, SpecCellFont, SpecCellStyle,
    SpecColumnDimension, SpecDocumentProperties,
};
pub use util::{derive_column_letters_from_index, sanitize_sheet_name};
pub use writer::{
    EnumWriterFormat, derive_writer_format_from_extension, parse_writer_format, write_document,
    write_document_to_vec,
};
