//! `gridkit_export`:
//! Streaming grid-to-spreadsheet export pipeline.
//!
//! Pulls batched records from a paged provider or a batch query, maps each
//! row through a configurable column pipeline and writes cells into a
//! [`gridkit_sheet`] document, one sheet per render.
//!
//! - `conf`     : defaults
//! - `spec`     : column/union/options/report models
//! - `error`    : top-level error taxonomy
//! - `format`   : display formats and the injectable value formatter
//! - `source`   : batch source state machine and DataFrame-backed sources
//! - `column`   : column registry (shorthand parsing, guessing, resolution)
//! - `exporter` : the render engine
//! - `util`     : shared helper functions
pub mod column;
pub mod conf;
pub mod error;
pub mod exporter;
pub mod format;
pub mod source;
pub mod spec;
pub mod util;

pub use column::{guess_columns, parse_column_shorthand, resolve_columns};
pub use error::ExportError;
pub use exporter::GridExporter;
pub use format::{EnumValueFormat, SpecValueFormatter, parse_value_format};
pub use source::{
    BatchQuery, BatchSource, DataFrameProvider, DataFrameQuery, EnumBatchState, PagedDataProvider,
    SpecBatch, SpecPageInfo, TypeBatchIter,
};
pub use spec::{
    EnumColumnConfig, EnumColumnStyle, EnumColumnValue, EnumRecordKey, ReportRender, SpecColumn,
    SpecHeaderUnion, SpecRecord, SpecRenderOptions, SpecSheetRenderStats, TypeStyleFn, TypeValueFn,
};
