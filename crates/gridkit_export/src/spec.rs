//! Export pipeline specification models: records, columns, header unions,
//! render options and the render report.

use std::fmt;
use std::sync::Arc;

use gridkit_sheet::{EnumCellValue, EnumWriterFormat, SpecCellStyle, SpecColumnDimension};

use crate::conf::{N_ROW_START_DEFAULT, N_SIZE_BATCH_DEFAULT};
use crate::format::EnumValueFormat;

////////////////////////////////////////////////////////////////////////////////
// #region Records

/// One data record: ordered `(field, value)` pairs. Field order is the
/// record's iteration order and drives column guessing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRecord {
    /// Ordered field name/value pairs.
    pub l_fields: Vec<(String, EnumCellValue)>,
}

impl SpecRecord {
    /// Build a record from ordered field pairs.
    pub fn new(l_fields: Vec<(String, EnumCellValue)>) -> Self {
        Self { l_fields }
    }

    /// Look up a field value by name.
    pub fn value_of(&self, name: &str) -> Option<&EnumCellValue> {
        self.l_fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Field names in record order.
    pub fn field_names(&self) -> Vec<&str> {
        self.l_fields.iter().map(|(field, _)| field.as_str()).collect()
    }
}

/// Key associated with one record.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumRecordKey {
    /// Positional key synthesized by the iteration layer.
    Index(usize),
    /// Key value supplied by the data source.
    Value(EnumCellValue),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnModel

/// Per-row cell value/content callback: `(record, key, model_index, column)`.
pub type TypeValueFn =
    Arc<dyn Fn(&SpecRecord, &EnumRecordKey, usize, &SpecColumn) -> EnumCellValue + Send + Sync>;
/// Per-row content-style callback: `(record, key, model_index, column)`.
pub type TypeStyleFn = Arc<
    dyn Fn(&SpecRecord, &EnumRecordKey, usize, &SpecColumn) -> Option<SpecCellStyle> + Send + Sync,
>;

/// Cell value derivation strategy, resolved once per column and applied per
/// row.
#[derive(Clone, Default)]
pub enum EnumColumnValue {
    /// No derivation; data cells fall back to the content callback or the
    /// null-display placeholder.
    #[default]
    None,
    /// Flat field lookup on the record.
    Attribute(String),
    /// Computed per row.
    Computed(TypeValueFn),
    /// Running 1-based row number, continuous across batches.
    Serial,
}

impl fmt::Debug for EnumColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Attribute(name) => write!(f, "Attribute({name:?})"),
            Self::Computed(_) => write!(f, "Computed(<fn>)"),
            Self::Serial => write!(f, "Serial"),
        }
    }
}

/// Content-cell style strategy.
#[derive(Clone, Default)]
pub enum EnumColumnStyle {
    /// No content style.
    #[default]
    None,
    /// Same style block for every data row.
    Static(SpecCellStyle),
    /// Style computed per row; `None` results perform no style write.
    Computed(TypeStyleFn),
}

impl fmt::Debug for EnumColumnStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Static(style) => write!(f, "Static({style:?})"),
            Self::Computed(_) => write!(f, "Computed(<fn>)"),
        }
    }
}

/// One output column: header/footer derivation, value derivation, display
/// format, style blocks and sizing directives.
#[derive(Clone)]
pub struct SpecColumn {
    /// Explicit header text; when `None` the header is derived from the
    /// attribute name.
    pub header: Option<String>,
    /// Footer text.
    pub footer: Option<String>,
    /// Value derivation strategy.
    pub value: EnumColumnValue,
    /// Raw content callback; bypasses the formatter entirely.
    pub content: Option<TypeValueFn>,
    /// Display format handed to the value formatter.
    pub format: EnumValueFormat,
    /// Static filter-row text.
    pub filter: Option<String>,
    /// Header cell style.
    pub style_header: Option<SpecCellStyle>,
    /// Footer cell style.
    pub style_footer: Option<SpecCellStyle>,
    /// Filter cell style.
    pub style_filter: Option<SpecCellStyle>,
    /// Content cell style strategy.
    pub style_content: EnumColumnStyle,
    /// Column sizing directives, applied once before any row is written.
    pub dimension: Option<SpecColumnDimension>,
    /// Invisible columns are dropped before layout and never occupy a
    /// physical column slot.
    pub if_visible: bool,
}

impl Default for SpecColumn {
    fn default() -> Self {
        Self {
            header: None,
            footer: None,
            value: EnumColumnValue::None,
            content: None,
            format: EnumValueFormat::Raw,
            filter: None,
            style_header: None,
            style_footer: None,
            style_filter: None,
            style_content: EnumColumnStyle::None,
            dimension: None,
            if_visible: true,
        }
    }
}

impl fmt::Debug for SpecColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecColumn")
            .field("header", &self.header)
            .field("footer", &self.footer)
            .field("value", &self.value)
            .field("content", &self.content.as_ref().map(|_| "<fn>"))
            .field("format", &self.format)
            .field("filter", &self.filter)
            .field("style_content", &self.style_content)
            .field("dimension", &self.dimension)
            .field("if_visible", &self.if_visible)
            .finish()
    }
}

impl SpecColumn {
    /// Attribute name backing this column, if any.
    pub fn attribute(&self) -> Option<&str> {
        match &self.value {
            EnumColumnValue::Attribute(name) => Some(name),
            _ => None,
        }
    }
}

/// Raw column configuration entry, resolved by the column registry.
#[derive(Debug, Clone)]
pub enum EnumColumnConfig {
    /// Compact `attribute[:format[:label]]` string.
    Shorthand(String),
    /// Fully structured column.
    Spec(SpecColumn),
}

/// Header-row grouping folding `length` columns under one shared label,
/// after `offset` individually rendered columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecHeaderUnion {
    /// Shared label rendered across the grouped columns.
    pub header: String,
    /// Plain columns rendered individually before the grouped block.
    pub offset: usize,
    /// Columns folded under the merged label cell.
    pub length: usize,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RenderOptions

/// Render-wide options. `title`, the source and the column set are expected
/// to be reconfigured between repeated renders for multi-sheet documents.
#[derive(Debug, Clone)]
pub struct SpecRenderOptions {
    /// Render the header section.
    pub if_show_header: bool,
    /// Render the footer section.
    pub if_show_footer: bool,
    /// Render one filter row after the header section.
    pub if_show_filter: bool,
    /// Active sheet title.
    pub title: Option<String>,
    /// Display text for blank header/footer/filter cells.
    pub empty_cell: String,
    /// Display text for `null` data values. Distinct from `empty_cell`.
    pub null_display: String,
    /// Sheet row from which rendering starts.
    pub n_row_start: usize,
    /// Records fetched per batch-query pull.
    pub size_batch: usize,
    /// Ordered header column unions; empty list renders simple headers.
    pub l_header_unions: Vec<SpecHeaderUnion>,
    /// Writer format override; `None` resolves from the save extension.
    pub writer_format: Option<EnumWriterFormat>,
}

impl Default for SpecRenderOptions {
    fn default() -> Self {
        Self {
            if_show_header: true,
            if_show_footer: false,
            if_show_filter: false,
            title: None,
            empty_cell: String::new(),
            null_display: String::new(),
            n_row_start: N_ROW_START_DEFAULT,
            size_batch: N_SIZE_BATCH_DEFAULT,
            l_header_unions: Vec::new(),
            writer_format: None,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RenderReport

/// Per-sheet render statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSheetRenderStats {
    /// Sheet title at render time.
    pub title: Option<String>,
    /// Resolved visible column count.
    pub n_cols: usize,
    /// Data records written.
    pub n_models: usize,
    /// Logical rows written (headers + filter + data + footer).
    pub n_rows_written: usize,
}

/// Accumulated report across all renders of one exporter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportRender {
    /// One entry per rendered sheet.
    pub l_sheets: Vec<SpecSheetRenderStats>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl ReportRender {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
