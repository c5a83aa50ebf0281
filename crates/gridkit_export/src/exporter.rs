//! The render engine: streams batched records through the resolved column
//! pipeline into a growing multi-sheet document, then hands the document to
//! a registered writer.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use gridkit_sheet::document::{SpecCellCoordinate, SpecCellRange};
use gridkit_sheet::writer::{derive_writer_format_from_extension, write_document, write_document_to_vec};
use gridkit_sheet::{
    EnumCellValue, EnumWriterFormat, SheetError, SpecCellStyle, SpecDocument,
    SpecDocumentProperties,
};

use crate::column::resolve_columns;
use crate::conf::C_HEADER_SERIAL_DEFAULT;
use crate::error::ExportError;
use crate::format::SpecValueFormatter;
use crate::source::{BatchQuery, BatchSource, PagedDataProvider, SpecBatch};
use crate::spec::{
    EnumColumnConfig, EnumColumnStyle, EnumColumnValue, EnumRecordKey, ReportRender, SpecColumn,
    SpecHeaderUnion, SpecRecord, SpecRenderOptions, SpecSheetRenderStats,
};
use crate::util::humanize_attribute_label;

////////////////////////////////////////////////////////////////////////////////
// #region Exporter

/// Streaming grid-to-document exporter.
///
/// One `render()` call composes one sheet. Repeated renders append sheets;
/// reconfigure the title, source and columns between calls:
///
/// ```no_run
/// # use gridkit_export::exporter::GridExporter;
/// # fn provider() -> Box<dyn gridkit_export::source::PagedDataProvider> { unimplemented!() }
/// let mut exporter = GridExporter::new();
/// exporter.options.title = Some("Monitors".to_string());
/// exporter.set_data_provider(provider());
/// exporter.render()?;
///
/// exporter.options.title = Some("Keyboards".to_string());
/// exporter.set_data_provider(provider());
/// exporter.render()?;
/// exporter.save("office-equipment.xlsx")?;
/// # Ok::<(), gridkit_export::error::ExportError>(())
/// ```
pub struct GridExporter {
    document: SpecDocument,
    formatter: SpecValueFormatter,
    /// Render-wide options; reconfigure freely between renders.
    pub options: SpecRenderOptions,
    l_columns_config: Vec<EnumColumnConfig>,
    provider: Option<Box<dyn PagedDataProvider>>,
    query: Option<Box<dyn BatchQuery>>,
    /// Row cursor for the next unwritten row on the active sheet. After a
    /// render it sits one past the last written row.
    pub row_index: usize,
    if_rendered: bool,
    report: ReportRender,
}

impl Default for GridExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl GridExporter {
    /// New exporter with a defaulted value formatter.
    pub fn new() -> Self {
        Self {
            document: SpecDocument::new(),
            formatter: SpecValueFormatter::default(),
            options: SpecRenderOptions::default(),
            l_columns_config: Vec::new(),
            provider: None,
            query: None,
            row_index: SpecRenderOptions::default().n_row_start,
            if_rendered: false,
            report: ReportRender::default(),
        }
    }

    /// Replace the injected value formatter.
    pub fn with_formatter(mut self, formatter: SpecValueFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Set the column configuration for the next render.
    pub fn set_columns(&mut self, l_columns: Vec<EnumColumnConfig>) -> &mut Self {
        self.l_columns_config = l_columns;
        self
    }

    /// Set the paged data provider for the next render.
    pub fn set_data_provider(&mut self, provider: Box<dyn PagedDataProvider>) -> &mut Self {
        self.provider = Some(provider);
        self
    }

    /// Set the batch query for the next render. A configured query takes
    /// precedence over a configured data provider.
    pub fn set_query(&mut self, query: Box<dyn BatchQuery>) -> &mut Self {
        self.query = Some(query);
        self
    }

    /// Set the header column unions for the next render.
    pub fn set_header_unions(&mut self, l_unions: Vec<SpecHeaderUnion>) -> &mut Self {
        self.options.l_header_unions = l_unions;
        self
    }

    /// Merge non-`None` fields into the document metadata.
    pub fn properties(&mut self, properties: &SpecDocumentProperties) -> &mut Self {
        self.document.properties.merge(properties);
        self
    }

    /// The composed document.
    pub fn document(&self) -> &SpecDocument {
        &self.document
    }

    /// Accumulated per-sheet render statistics.
    pub fn report(&self) -> &ReportRender {
        &self.report
    }

    /// Whether at least one render has completed.
    pub fn is_rendered(&self) -> bool {
        self.if_rendered
    }

    /// Compose one sheet from the configured source.
    ///
    /// The first call fills the document's initial sheet; later calls append
    /// a fresh sheet and reset the row cursor, keeping previously rendered
    /// sheets intact. The configured source is iterated to exhaustion and
    /// then handed back, so an unchanged configuration re-renders the same
    /// data onto the next sheet.
    pub fn render(&mut self) -> Result<&mut Self, ExportError> {
        // The query wins when both sources are configured; the idle provider
        // stays configured for later renders.
        let mut source = match (self.query.take(), self.provider.take()) {
            (Some(query), provider) => {
                if provider.is_some() {
                    warn!("both a query and a data provider are configured; the query wins");
                }
                self.provider = provider;
                BatchSource::new_query(query, self.options.size_batch)
            }
            (None, Some(provider)) => BatchSource::new_paged(provider),
            (None, None) => {
                return Err(ExportError::Configuration(
                    "no data source configured: set a data provider or a query".to_string(),
                ));
            }
        };
        // On fatal errors below the source is dropped with the failed render;
        // on success its parts are handed back for later re-renders.

        if self.if_rendered {
            let n_idx_sheet = self.document.create_sheet();
            self.document.set_active_sheet(n_idx_sheet)?;
        }
        if let Some(title) = &self.options.title {
            self.document.set_sheet_title(title);
        }

        self.row_index = self.options.n_row_start;
        debug!(
            "render start: sheet={} row_start={}",
            self.document.active_sheet_index(),
            self.row_index
        );

        let mut l_columns: Vec<SpecColumn> = Vec::new();
        let mut if_columns_initialized = false;
        let mut n_model_index = 0usize;

        while let Some(batch) = source.next_batch()? {
            if !if_columns_initialized {
                l_columns = resolve_columns(&self.l_columns_config, batch.l_models.first())?;
                self.apply_column_dimensions(&l_columns);
                if self.options.if_show_header {
                    self.render_header(&l_columns)?;
                }
                if self.options.if_show_filter {
                    self.render_filter_row(&l_columns)?;
                }
                if_columns_initialized = true;
            }

            self.render_body(&l_columns, &batch, &mut n_model_index)?;
            // `batch` drops here: only one batch is ever held in memory.
        }

        if if_columns_initialized && self.options.if_show_footer {
            self.render_footer(&l_columns)?;
        }

        let (provider, query) = source.into_parts();
        if provider.is_some() {
            self.provider = provider;
        }
        if query.is_some() {
            self.query = query;
        }

        self.report.l_sheets.push(SpecSheetRenderStats {
            title: self.options.title.clone(),
            n_cols: l_columns.len(),
            n_models: n_model_index,
            n_rows_written: self.row_index - self.options.n_row_start,
        });
        debug!(
            "render done: {} models, row_index={}",
            n_model_index, self.row_index
        );

        self.if_rendered = true;
        Ok(self)
    }

    /// Render if needed, then write the document to `path`, creating missing
    /// parent directories. The writer format comes from the
    /// `options.writer_format` override or the file extension.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, ExportError> {
        if !self.if_rendered {
            self.render()?;
        }

        let path = path.as_ref();
        if let Some(dir_parent) = path.parent() {
            if !dir_parent.as_os_str().is_empty() {
                fs::create_dir_all(dir_parent)?;
            }
        }

        let format = match self.options.writer_format {
            Some(format) => format,
            None => derive_writer_format_from_extension(path)?,
        };
        write_document(&self.document, path, format)?;
        Ok(self)
    }

    /// Render if needed, then encode the document into a byte buffer.
    pub fn export_to_vec(&mut self, format: EnumWriterFormat) -> Result<Vec<u8>, ExportError> {
        if !self.if_rendered {
            self.render()?;
        }
        Ok(write_document_to_vec(&self.document, format)?)
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region RowEmission

    fn apply_column_dimensions(&mut self, l_columns: &[SpecColumn]) {
        for (n_idx_col, column) in l_columns.iter().enumerate() {
            if let Some(dimension) = column.dimension {
                self.document.set_column_dimension(n_idx_col, dimension);
            }
        }
    }

    fn render_body(
        &mut self,
        l_columns: &[SpecColumn],
        batch: &SpecBatch,
        n_model_index: &mut usize,
    ) -> Result<(), ExportError> {
        for (n_idx_in_batch, record) in batch.l_models.iter().enumerate() {
            let key = batch
                .l_keys
                .get(n_idx_in_batch)
                .cloned()
                .unwrap_or(EnumRecordKey::Index(n_idx_in_batch));

            for (n_idx_col, column) in l_columns.iter().enumerate() {
                let coord = SpecCellCoordinate::new(n_idx_col, self.row_index);
                self.render_data_cell(column, coord, record, &key, *n_model_index)?;
            }
            self.row_index += 1;
            *n_model_index += 1;
        }
        Ok(())
    }

    /// Emit the header section: one plain row, or two physical rows when
    /// header unions are configured.
    fn render_header(&mut self, l_columns: &[SpecColumn]) -> Result<(), ExportError> {
        if self.options.l_header_unions.is_empty() {
            for (n_idx_col, column) in l_columns.iter().enumerate() {
                self.render_header_cell(column, SpecCellCoordinate::new(n_idx_col, self.row_index))?;
            }
            self.row_index += 1;
            return Ok(());
        }

        let n_row_upper = self.row_index;
        let n_row_lower = self.row_index + 1;
        let l_unions = self.options.l_header_unions.clone();
        let mut n_idx_col = 0usize;

        for union in &l_unions {
            if union.length == 0 {
                return Err(ExportError::Configuration(format!(
                    "Header union {:?} must group at least one column",
                    union.header
                )));
            }
            let n_remaining = l_columns.len() - n_idx_col;
            if union.offset + union.length > n_remaining {
                return Err(ExportError::Configuration(format!(
                    "Header union {:?} consumes {} columns but only {n_remaining} remain",
                    union.header,
                    union.offset + union.length
                )));
            }

            for _ in 0..union.offset {
                self.render_header_cell(
                    &l_columns[n_idx_col],
                    SpecCellCoordinate::new(n_idx_col, n_row_upper),
                )?;
                self.merge_vertical_header(n_idx_col, n_row_upper, n_row_lower)?;
                n_idx_col += 1;
            }

            let c_label = derive_cell_text(Some(&union.header), &self.options.empty_cell);
            self.write_cell(
                SpecCellCoordinate::new(n_idx_col, n_row_upper),
                EnumCellValue::Text(c_label),
                None,
            )?;

            let n_idx_col_start = n_idx_col;
            for n_idx_under in 0..union.length {
                self.render_header_cell(
                    &l_columns[n_idx_col],
                    SpecCellCoordinate::new(n_idx_col, n_row_lower),
                )?;
                if n_idx_under + 1 < union.length {
                    n_idx_col += 1;
                }
            }
            if n_idx_col > n_idx_col_start {
                self.document
                    .merge_cells(SpecCellRange::new(
                        SpecCellCoordinate::new(n_idx_col_start, n_row_upper),
                        SpecCellCoordinate::new(n_idx_col, n_row_upper),
                    ))
                    .map_err(ExportError::from)?;
            }
            n_idx_col += 1;
        }

        while n_idx_col < l_columns.len() {
            self.render_header_cell(
                &l_columns[n_idx_col],
                SpecCellCoordinate::new(n_idx_col, n_row_upper),
            )?;
            self.merge_vertical_header(n_idx_col, n_row_upper, n_row_lower)?;
            n_idx_col += 1;
        }

        self.row_index += 2;
        Ok(())
    }

    fn merge_vertical_header(
        &mut self,
        n_idx_col: usize,
        n_row_upper: usize,
        n_row_lower: usize,
    ) -> Result<(), ExportError> {
        self.document
            .merge_cells(SpecCellRange::new(
                SpecCellCoordinate::new(n_idx_col, n_row_upper),
                SpecCellCoordinate::new(n_idx_col, n_row_lower),
            ))
            .map_err(ExportError::from)
    }

    fn render_filter_row(&mut self, l_columns: &[SpecColumn]) -> Result<(), ExportError> {
        for (n_idx_col, column) in l_columns.iter().enumerate() {
            self.render_filter_cell(column, SpecCellCoordinate::new(n_idx_col, self.row_index))?;
        }
        self.row_index += 1;
        Ok(())
    }

    fn render_footer(&mut self, l_columns: &[SpecColumn]) -> Result<(), ExportError> {
        for (n_idx_col, column) in l_columns.iter().enumerate() {
            self.render_footer_cell(column, SpecCellCoordinate::new(n_idx_col, self.row_index))?;
        }
        self.row_index += 1;
        Ok(())
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region CellFunnel

    fn render_header_cell(
        &mut self,
        column: &SpecColumn,
        coord: SpecCellCoordinate,
    ) -> Result<(), ExportError> {
        let c_derived = match &column.header {
            Some(header) => Some(header.clone()),
            None => match &column.value {
                EnumColumnValue::Attribute(name) => Some(humanize_attribute_label(name)),
                EnumColumnValue::Serial => Some(C_HEADER_SERIAL_DEFAULT.to_string()),
                _ => None,
            },
        };
        let c_content = derive_cell_text(c_derived.as_deref(), &self.options.empty_cell);
        self.write_cell(
            coord,
            EnumCellValue::Text(c_content),
            column.style_header.clone(),
        )
    }

    fn render_footer_cell(
        &mut self,
        column: &SpecColumn,
        coord: SpecCellCoordinate,
    ) -> Result<(), ExportError> {
        let c_content = derive_cell_text(column.footer.as_deref(), &self.options.empty_cell);
        self.write_cell(
            coord,
            EnumCellValue::Text(c_content),
            column.style_footer.clone(),
        )
    }

    fn render_filter_cell(
        &mut self,
        column: &SpecColumn,
        coord: SpecCellCoordinate,
    ) -> Result<(), ExportError> {
        let c_content = derive_cell_text(column.filter.as_deref(), &self.options.empty_cell);
        self.write_cell(
            coord,
            EnumCellValue::Text(c_content),
            column.style_filter.clone(),
        )
    }

    fn render_data_cell(
        &mut self,
        column: &SpecColumn,
        coord: SpecCellCoordinate,
        record: &SpecRecord,
        key: &EnumRecordKey,
        n_model_index: usize,
    ) -> Result<(), ExportError> {
        let value = match &column.content {
            // A content callback bypasses value derivation and the formatter.
            Some(content_fn) => content_fn(record, key, n_model_index, column),
            None => {
                let derived = derive_data_cell_value(column, record, key, n_model_index);
                if derived.is_none() {
                    EnumCellValue::Text(self.options.null_display.clone())
                } else {
                    self.formatter
                        .format_value(&derived, &column.format)
                        .map_err(ExportError::Configuration)?
                }
            }
        };

        let style = match &column.style_content {
            EnumColumnStyle::None => None,
            EnumColumnStyle::Static(style) => Some(style.clone()),
            EnumColumnStyle::Computed(style_fn) => style_fn(record, key, n_model_index, column),
        };

        self.write_cell(coord, value, style)
    }

    /// The single sheet-write primitive every cell render funnels through.
    fn write_cell(
        &mut self,
        coord: SpecCellCoordinate,
        value: EnumCellValue,
        style: Option<SpecCellStyle>,
    ) -> Result<(), ExportError> {
        self.document.set_cell_value(coord, value);
        if let Some(style) = style {
            self.document
                .apply_cell_style(coord, &style)
                .map_err(|err| match err {
                    SheetError::Style(msg) => ExportError::Style(format!("cell {coord}: {msg}")),
                    other => ExportError::from(other),
                })?;
        }
        Ok(())
    }

    // #endregion
}

fn derive_data_cell_value(
    column: &SpecColumn,
    record: &SpecRecord,
    key: &EnumRecordKey,
    n_model_index: usize,
) -> EnumCellValue {
    match &column.value {
        EnumColumnValue::None => EnumCellValue::None,
        EnumColumnValue::Attribute(name) => {
            record.value_of(name).cloned().unwrap_or(EnumCellValue::None)
        }
        EnumColumnValue::Computed(value_fn) => value_fn(record, key, n_model_index, column),
        EnumColumnValue::Serial => EnumCellValue::Number((n_model_index + 1) as f64),
    }
}

/// Header/footer/filter fallback: blank configured text renders the
/// empty-cell placeholder.
fn derive_cell_text(text: Option<&str>, empty_cell: &str) -> String {
    match text {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => empty_cell.to_string(),
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::EnumValueFormat;
    use crate::source::{DataFrameProvider, DataFrameQuery};
    use crate::spec::{EnumColumnStyle, SpecHeaderUnion};
    use gridkit_sheet::{SpecCellFill, SpecCellStyle};
    use polars::prelude::{Column, DataFrame};
    use std::sync::Arc;

    fn build_items_df() -> DataFrame {
        DataFrame::new(vec![
            Column::new("id".into(), vec![1i64, 2, 3]),
            Column::new("name".into(), vec!["first", "second", "third"]),
        ])
        .unwrap()
    }

    fn cell_text(exporter: &GridExporter, n_sheet: usize, n_col: usize, n_row: usize) -> String {
        exporter.document().sheets()[n_sheet]
            .cell_value(&SpecCellCoordinate::new(n_col, n_row))
            .to_display_string()
    }

    #[test]
    fn test_row_index_arithmetic_with_header_and_footer() {
        let mut exporter = GridExporter::new();
        exporter.options.if_show_footer = true;
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.render().unwrap();

        // start(1) + header(1) + models(3) + footer(1)
        assert_eq!(exporter.row_index, 6);
        assert!(exporter.is_rendered());
        let stats = &exporter.report().l_sheets[0];
        assert_eq!(stats.n_models, 3);
        assert_eq!(stats.n_cols, 2);
        assert_eq!(stats.n_rows_written, 5);
    }

    #[test]
    fn test_guessed_columns_render_headers_and_data() {
        let mut exporter = GridExporter::new();
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.render().unwrap();

        assert_eq!(cell_text(&exporter, 0, 0, 1), "Id");
        assert_eq!(cell_text(&exporter, 0, 1, 1), "Name");
        assert_eq!(cell_text(&exporter, 0, 0, 2), "1");
        assert_eq!(cell_text(&exporter, 0, 1, 2), "first");
        assert_eq!(cell_text(&exporter, 0, 1, 4), "third");
    }

    #[test]
    fn test_explicit_columns_with_formats() {
        let df = DataFrame::new(vec![
            Column::new("name".into(), vec!["some name", "name 2"]),
            Column::new("price".into(), vec![9879i64, 79]),
        ])
        .unwrap();

        let mut exporter = GridExporter::new();
        exporter.set_columns(vec![
            EnumColumnConfig::Shorthand("name".to_string()),
            EnumColumnConfig::Shorthand("price:currency:Price".to_string()),
        ]);
        exporter.set_data_provider(Box::new(DataFrameProvider::new(df)));
        exporter.render().unwrap();

        assert_eq!(cell_text(&exporter, 0, 1, 1), "Price");
        assert_eq!(cell_text(&exporter, 0, 1, 2), "$9,879.00");
        assert_eq!(cell_text(&exporter, 0, 0, 3), "name 2");
    }

    #[test]
    fn test_invisible_column_never_occupies_a_slot() {
        let mut exporter = GridExporter::new();
        exporter.set_columns(vec![
            EnumColumnConfig::Spec(SpecColumn {
                value: EnumColumnValue::Attribute("id".to_string()),
                if_visible: false,
                ..Default::default()
            }),
            EnumColumnConfig::Shorthand("name".to_string()),
        ]);
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.render().unwrap();

        assert_eq!(cell_text(&exporter, 0, 0, 1), "Name");
        assert_eq!(cell_text(&exporter, 0, 0, 2), "first");
        assert_eq!(
            exporter.document().sheets()[0].cell_value(&SpecCellCoordinate::new(1, 2)),
            EnumCellValue::None
        );
    }

    #[test]
    fn test_null_display_distinct_from_empty_cell() {
        let df = DataFrame::new(vec![
            Column::new("id".into(), vec![Some(1i64), None]),
            Column::new("name".into(), vec!["x", "y"]),
        ])
        .unwrap();

        let mut exporter = GridExporter::new();
        exporter.options.null_display = "N/A".to_string();
        exporter.options.empty_cell = "-".to_string();
        exporter.set_columns(vec![
            EnumColumnConfig::Shorthand("id".to_string()),
            EnumColumnConfig::Spec(SpecColumn {
                // Blank header text: renders the empty-cell placeholder.
                header: Some(String::new()),
                value: EnumColumnValue::Attribute("name".to_string()),
                ..Default::default()
            }),
        ]);
        exporter.set_data_provider(Box::new(DataFrameProvider::new(df)));
        exporter.render().unwrap();

        assert_eq!(cell_text(&exporter, 0, 1, 1), "-");
        assert_eq!(cell_text(&exporter, 0, 0, 3), "N/A");
        assert_eq!(cell_text(&exporter, 0, 1, 3), "y");
    }

    #[test]
    fn test_serial_column_is_continuous_across_batches() {
        let df = DataFrame::new(vec![Column::new(
            "name".into(),
            &["a", "b", "c", "d", "e"],
        )])
        .unwrap();

        let mut exporter = GridExporter::new();
        exporter.set_columns(vec![
            EnumColumnConfig::Spec(SpecColumn {
                value: EnumColumnValue::Serial,
                ..Default::default()
            }),
            EnumColumnConfig::Shorthand("name".to_string()),
        ]);
        exporter.set_data_provider(Box::new(
            DataFrameProvider::new(df).with_page_size(2),
        ));
        exporter.render().unwrap();

        assert_eq!(cell_text(&exporter, 0, 0, 1), "#");
        let l_serials: Vec<String> = (2..=6).map(|n_row| cell_text(&exporter, 0, 0, n_row)).collect();
        assert_eq!(l_serials, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_header_union_layout() {
        let df = DataFrame::new(vec![
            Column::new("alpha".into(), vec![1i64]),
            Column::new("beta".into(), vec![2i64]),
            Column::new("gamma".into(), vec![3i64]),
            Column::new("delta".into(), vec![4i64]),
            Column::new("epsilon".into(), vec![5i64]),
            Column::new("zeta".into(), vec![6i64]),
            Column::new("eta".into(), vec![7i64]),
        ])
        .unwrap();

        let mut exporter = GridExporter::new();
        exporter.set_header_unions(vec![
            SpecHeaderUnion {
                header: "Union 1".to_string(),
                offset: 1,
                length: 2,
            },
            SpecHeaderUnion {
                header: "Union 2".to_string(),
                offset: 2,
                length: 2,
            },
        ]);
        exporter.set_data_provider(Box::new(DataFrameProvider::new(df)));
        exporter.render().unwrap();

        // Upper row: plain columns and union labels.
        assert_eq!(cell_text(&exporter, 0, 0, 1), "Alpha");
        assert_eq!(cell_text(&exporter, 0, 1, 1), "Union 1");
        assert_eq!(cell_text(&exporter, 0, 3, 1), "Delta");
        assert_eq!(cell_text(&exporter, 0, 4, 1), "Epsilon");
        assert_eq!(cell_text(&exporter, 0, 5, 1), "Union 2");
        // Lower row: grouped columns' own headers.
        assert_eq!(cell_text(&exporter, 0, 1, 2), "Beta");
        assert_eq!(cell_text(&exporter, 0, 2, 2), "Gamma");
        assert_eq!(cell_text(&exporter, 0, 5, 2), "Zeta");
        assert_eq!(cell_text(&exporter, 0, 6, 2), "Eta");

        let l_merges: Vec<String> = exporter.document().sheets()[0]
            .merges()
            .iter()
            .map(|range| range.to_string())
            .collect();
        assert_eq!(l_merges, vec!["A1:A2", "B1:C1", "D1:D2", "E1:E2", "F1:G1"]);

        // Two header rows, then the single data row.
        assert_eq!(cell_text(&exporter, 0, 0, 3), "1");
        assert_eq!(exporter.row_index, 4);
    }

    #[test]
    fn test_header_union_underflow_is_a_configuration_error() {
        let mut exporter = GridExporter::new();
        exporter.set_header_unions(vec![SpecHeaderUnion {
            header: "Too wide".to_string(),
            offset: 2,
            length: 2,
        }]);
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        assert!(matches!(
            exporter.render(),
            Err(ExportError::Configuration(_))
        ));
    }

    #[test]
    fn test_content_callback_bypasses_formatter() {
        let mut exporter = GridExporter::new();
        exporter.set_columns(vec![EnumColumnConfig::Spec(SpecColumn {
            header: Some("Fixed".to_string()),
            format: EnumValueFormat::Currency,
            content: Some(Arc::new(|_, _, _, _| {
                EnumCellValue::Text("verbatim".to_string())
            })),
            ..Default::default()
        })]);
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.render().unwrap();

        assert_eq!(cell_text(&exporter, 0, 0, 2), "verbatim");
    }

    #[test]
    fn test_computed_value_and_computed_style() {
        let mut exporter = GridExporter::new();
        exporter.set_columns(vec![EnumColumnConfig::Spec(SpecColumn {
            header: Some("Big id".to_string()),
            value: EnumColumnValue::Computed(Arc::new(|record, _, _, _| {
                match record.value_of("id") {
                    Some(EnumCellValue::Number(id)) => EnumCellValue::Number(id * 10.0),
                    _ => EnumCellValue::None,
                }
            })),
            style_content: EnumColumnStyle::Computed(Arc::new(|record, _, _, _| {
                match record.value_of("id") {
                    Some(EnumCellValue::Number(id)) if *id > 2.0 => Some(SpecCellStyle {
                        fill: Some(SpecCellFill {
                            bg_color: Some("FF0000".to_string()),
                        }),
                        ..Default::default()
                    }),
                    _ => None,
                }
            })),
            ..Default::default()
        })]);
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.render().unwrap();

        assert_eq!(cell_text(&exporter, 0, 0, 2), "10");
        assert_eq!(cell_text(&exporter, 0, 0, 4), "30");

        let sheet = &exporter.document().sheets()[0];
        assert!(
            sheet
                .cell(&SpecCellCoordinate::new(0, 2))
                .unwrap()
                .style
                .fill
                .is_none()
        );
        assert_eq!(
            sheet
                .cell(&SpecCellCoordinate::new(0, 4))
                .unwrap()
                .style
                .fill
                .as_ref()
                .unwrap()
                .bg_color
                .as_deref(),
            Some("FF0000")
        );
    }

    #[test]
    fn test_filter_row_adds_one_row() {
        let mut exporter = GridExporter::new();
        exporter.options.if_show_filter = true;
        exporter.options.empty_cell = "-".to_string();
        exporter.set_columns(vec![
            EnumColumnConfig::Spec(SpecColumn {
                value: EnumColumnValue::Attribute("id".to_string()),
                filter: Some("> 0".to_string()),
                ..Default::default()
            }),
            EnumColumnConfig::Shorthand("name".to_string()),
        ]);
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.render().unwrap();

        assert_eq!(cell_text(&exporter, 0, 0, 2), "> 0");
        assert_eq!(cell_text(&exporter, 0, 1, 2), "-");
        assert_eq!(cell_text(&exporter, 0, 0, 3), "1");
        // start(1) + header(1) + filter(1) + models(3)
        assert_eq!(exporter.row_index, 6);
    }

    #[test]
    fn test_multi_sheet_composition_without_cross_contamination() {
        let df_second = DataFrame::new(vec![
            Column::new("id".into(), vec![3i64, 4]),
            Column::new("name".into(), vec!["third", "fourth"]),
        ])
        .unwrap();

        let mut exporter = GridExporter::new();
        exporter.options.title = Some("items page 1".to_string());
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.render().unwrap();

        exporter.options.title = Some("items page 2".to_string());
        exporter.set_data_provider(Box::new(DataFrameProvider::new(df_second)));
        exporter.render().unwrap();

        let document = exporter.document();
        assert_eq!(document.sheets().len(), 2);
        assert_eq!(document.sheets()[0].title.as_deref(), Some("items page 1"));
        assert_eq!(document.sheets()[1].title.as_deref(), Some("items page 2"));
        assert_eq!(cell_text(&exporter, 0, 1, 2), "first");
        assert_eq!(cell_text(&exporter, 1, 1, 2), "third");
        assert_eq!(cell_text(&exporter, 1, 1, 3), "fourth");
        // Second sheet holds two models: start(1) + header(1) + 2.
        assert_eq!(exporter.row_index, 4);
        assert_eq!(exporter.report().l_sheets.len(), 2);
    }

    #[test]
    fn test_repeated_render_reuses_the_configured_provider() {
        let mut exporter = GridExporter::new();
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.render().unwrap();
        exporter.render().unwrap();

        assert_eq!(exporter.document().sheets().len(), 2);
        assert_eq!(cell_text(&exporter, 0, 1, 2), "first");
        assert_eq!(cell_text(&exporter, 1, 1, 2), "first");
    }

    #[test]
    fn test_query_source_renders_with_synthesized_keys() {
        let mut exporter = GridExporter::new();
        exporter.options.size_batch = 2;
        exporter.set_query(Box::new(DataFrameQuery::new(build_items_df())));
        exporter.render().unwrap();

        assert_eq!(cell_text(&exporter, 0, 0, 2), "1");
        assert_eq!(cell_text(&exporter, 0, 1, 4), "third");
    }

    #[test]
    fn test_empty_cursor_renders_no_header() {
        let df = build_items_df().slice(0, 0);
        let mut exporter = GridExporter::new();
        exporter.set_query(Box::new(DataFrameQuery::new(df)));
        exporter.render().unwrap();

        assert!(exporter.document().sheets()[0].extent().is_none());
        assert_eq!(exporter.row_index, 1);
    }

    #[test]
    fn test_empty_provider_still_renders_header() {
        let df = build_items_df().slice(0, 0);
        let mut exporter = GridExporter::new();
        exporter.set_columns(vec![
            EnumColumnConfig::Shorthand("id".to_string()),
            EnumColumnConfig::Shorthand("name".to_string()),
        ]);
        exporter.set_data_provider(Box::new(DataFrameProvider::new(df)));
        exporter.render().unwrap();

        assert_eq!(cell_text(&exporter, 0, 0, 1), "Id");
        assert_eq!(exporter.row_index, 2);
    }

    #[test]
    fn test_render_without_source_fails_before_touching_the_document() {
        let mut exporter = GridExporter::new();
        assert!(matches!(
            exporter.render(),
            Err(ExportError::Configuration(_))
        ));
        assert!(!exporter.is_rendered());
    }

    #[test]
    fn test_column_dimensions_are_applied_once() {
        let mut exporter = GridExporter::new();
        exporter.set_columns(vec![
            EnumColumnConfig::Spec(SpecColumn {
                value: EnumColumnValue::Attribute("id".to_string()),
                dimension: Some(gridkit_sheet::SpecColumnDimension {
                    width: Some(12.0),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            EnumColumnConfig::Shorthand("name".to_string()),
        ]);
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.render().unwrap();

        let dims = exporter.document().sheets()[0].column_dimensions();
        assert_eq!(dims.get(&0).and_then(|dim| dim.width), Some(12.0));
        assert!(dims.get(&1).is_none());
    }

    #[test]
    fn test_save_creates_parent_directories_and_resolves_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/report.xlsx");

        let mut exporter = GridExporter::new();
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.save(&path).unwrap();

        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_save_unknown_extension_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.ods");

        let mut exporter = GridExporter::new();
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        assert!(matches!(
            exporter.save(&path),
            Err(ExportError::Configuration(_))
        ));
    }

    #[test]
    fn test_export_to_vec_csv() {
        let mut exporter = GridExporter::new();
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        let v_bytes = exporter.export_to_vec(EnumWriterFormat::Csv).unwrap();
        let text = String::from_utf8(v_bytes).unwrap();
        assert_eq!(text, "Id,Name\n1,first\n2,second\n3,third\n");
    }

    #[test]
    fn test_save_renders_lazily_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lazy.csv");

        let mut exporter = GridExporter::new();
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        exporter.save(&path).unwrap();
        assert_eq!(exporter.document().sheets().len(), 1);
        // Saving again must not re-render or append sheets.
        exporter.save(&path).unwrap();
        assert_eq!(exporter.document().sheets().len(), 1);
    }

    #[test]
    fn test_document_properties_are_merged() {
        let mut exporter = GridExporter::new();
        exporter.properties(&SpecDocumentProperties {
            title: Some("Report".to_string()),
            creator: Some("gridkit".to_string()),
            ..Default::default()
        });
        exporter.set_data_provider(Box::new(DataFrameProvider::new(build_items_df())));
        let v_bytes = exporter.export_to_vec(EnumWriterFormat::Xlsx).unwrap();
        assert_eq!(v_bytes[0], b'P');
        assert_eq!(v_bytes[1], b'K');
        assert_eq!(
            exporter.document().properties.title.as_deref(),
            Some("Report")
        );
    }
}
