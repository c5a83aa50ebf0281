//! In-memory workbook/worksheet object model mutated by render pipelines
//! and encoded by the format writers.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::{
    EnumCellValue, SheetError, SpecCellStyle, SpecColumnDimension, SpecDocumentProperties,
};
use crate::util::{derive_column_letters_from_index, normalize_color_hex};

////////////////////////////////////////////////////////////////////////////////
// #region Coordinates

/// One cell position: zero-based column, one-based row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecCellCoordinate {
    /// Zero-based column index (`0 -> A`).
    pub n_col: usize,
    /// One-based row index.
    pub n_row: usize,
}

impl SpecCellCoordinate {
    /// Build a coordinate from column and row indices.
    pub fn new(n_col: usize, n_row: usize) -> Self {
        Self { n_col, n_row }
    }
}

impl fmt::Display for SpecCellCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            derive_column_letters_from_index(self.n_col),
            self.n_row
        )
    }
}

/// Inclusive rectangular cell range, displayed as `A1:E1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecCellRange {
    /// Top-left corner.
    pub start: SpecCellCoordinate,
    /// Bottom-right corner.
    pub end: SpecCellCoordinate,
}

impl SpecCellRange {
    /// Build a range from two corner coordinates.
    pub fn new(start: SpecCellCoordinate, end: SpecCellCoordinate) -> Self {
        Self { start, end }
    }

    /// Whether `coord` lies inside this range.
    pub fn contains(&self, coord: &SpecCellCoordinate) -> bool {
        coord.n_col >= self.start.n_col
            && coord.n_col <= self.end.n_col
            && coord.n_row >= self.start.n_row
            && coord.n_row <= self.end.n_row
    }
}

impl fmt::Display for SpecCellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetModel

/// One stored cell: value plus accumulated style.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecCell {
    /// Cell content.
    pub value: EnumCellValue,
    /// Accumulated style block.
    pub style: SpecCellStyle,
}

/// One worksheet: sparse cell grid plus merges, column dimensions and title.
#[derive(Debug, Clone, Default)]
pub struct SpecSheet {
    /// Sheet title; `None` keeps the writer's default naming.
    pub title: Option<String>,
    /// Sparse cells keyed by `(row, col)`.
    dict_cells: BTreeMap<(usize, usize), SpecCell>,
    /// Merged ranges in application order.
    l_merges: Vec<SpecCellRange>,
    /// Column sizing directives keyed by zero-based column index.
    dict_col_dimensions: BTreeMap<usize, SpecColumnDimension>,
}

impl SpecSheet {
    /// Set cell content, creating the cell slot when absent.
    pub fn set_cell_value(&mut self, coord: SpecCellCoordinate, value: EnumCellValue) {
        self.dict_cells
            .entry((coord.n_row, coord.n_col))
            .or_default()
            .value = value;
    }

    /// Read one cell, if present.
    pub fn cell(&self, coord: &SpecCellCoordinate) -> Option<&SpecCell> {
        self.dict_cells.get(&(coord.n_row, coord.n_col))
    }

    /// Read one cell's value; absent cells read as [`EnumCellValue::None`].
    pub fn cell_value(&self, coord: &SpecCellCoordinate) -> EnumCellValue {
        self.cell(coord)
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    }

    /// Apply a style block to the cell at `coord`.
    ///
    /// The alignment sub-block is its own style domain: it is applied first
    /// and removed from the block; if nothing else remains the general
    /// application is skipped. An empty block performs no write at all.
    pub fn apply_cell_style(
        &mut self,
        coord: SpecCellCoordinate,
        style: &SpecCellStyle,
    ) -> Result<(), SheetError> {
        if style.is_empty() {
            return Ok(());
        }
        validate_cell_style(style)?;

        let cell = self
            .dict_cells
            .entry((coord.n_row, coord.n_col))
            .or_default();

        if let Some(alignment) = style.alignment {
            if !alignment.is_empty() {
                cell.style.alignment = Some(alignment);
            }
            if style.is_empty_besides_alignment() {
                return Ok(());
            }
        }

        if let Some(font) = &style.font {
            cell.style.font = Some(font.clone());
        }
        if let Some(border) = style.border {
            cell.style.border = Some(border);
        }
        if let Some(fill) = &style.fill {
            cell.style.fill = Some(fill.clone());
        }
        if let Some(num_format) = &style.num_format {
            cell.style.num_format = Some(num_format.clone());
        }
        Ok(())
    }

    /// Merge a cell range into one display cell.
    pub fn merge_cells(&mut self, range: SpecCellRange) -> Result<(), SheetError> {
        if range.end.n_col < range.start.n_col || range.end.n_row < range.start.n_row {
            return Err(SheetError::Style(format!("Inverted merge range: {range}")));
        }
        if range.start == range.end {
            return Err(SheetError::Style(format!(
                "Merge range must span more than one cell: {range}"
            )));
        }
        self.l_merges.push(range);
        Ok(())
    }

    /// Merged ranges in application order.
    pub fn merges(&self) -> &[SpecCellRange] {
        &self.l_merges
    }

    /// Whether `coord` is covered by a merge without being its anchor.
    pub fn is_merge_covered(&self, coord: &SpecCellCoordinate) -> bool {
        self.l_merges
            .iter()
            .any(|range| range.contains(coord) && range.start != *coord)
    }

    /// Set sizing directives for one column.
    pub fn set_column_dimension(&mut self, n_idx_col: usize, dimension: SpecColumnDimension) {
        self.dict_col_dimensions.insert(n_idx_col, dimension);
    }

    /// Column sizing directives keyed by column index.
    pub fn column_dimensions(&self) -> &BTreeMap<usize, SpecColumnDimension> {
        &self.dict_col_dimensions
    }

    /// Stored cells keyed by `(row, col)`.
    pub fn cells(&self) -> &BTreeMap<(usize, usize), SpecCell> {
        &self.dict_cells
    }

    /// `(max_row, max_col)` extent over stored cells and merges; `None` for
    /// an empty sheet.
    pub fn extent(&self) -> Option<(usize, usize)> {
        let mut n_row_max = 0usize;
        let mut n_col_max = 0usize;
        let mut if_any = false;
        for (n_row, n_col) in self.dict_cells.keys() {
            n_row_max = usize::max(n_row_max, *n_row);
            n_col_max = usize::max(n_col_max, *n_col);
            if_any = true;
        }
        for range in &self.l_merges {
            n_row_max = usize::max(n_row_max, range.end.n_row);
            n_col_max = usize::max(n_col_max, range.end.n_col);
            if_any = true;
        }
        if_any.then_some((n_row_max, n_col_max))
    }
}

fn validate_cell_style(style: &SpecCellStyle) -> Result<(), SheetError> {
    if let Some(font) = &style.font {
        if let Some(size) = font.size {
            if !size.is_finite() || size <= 0.0 {
                return Err(SheetError::Style(format!("Invalid font size: {size}")));
            }
        }
        if let Some(color) = &font.color {
            normalize_color_hex(color).map_err(SheetError::Style)?;
        }
    }
    if let Some(fill) = &style.fill {
        if let Some(color) = &fill.bg_color {
            normalize_color_hex(color).map_err(SheetError::Style)?;
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DocumentModel

/// Multi-sheet document: the mutation target of a render and the input of
/// the format writers.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    l_sheets: Vec<SpecSheet>,
    n_sheet_active: usize,
    /// Document metadata carried into the encoded output.
    pub properties: SpecDocumentProperties,
}

impl Default for SpecDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecDocument {
    /// New document with one empty active sheet.
    pub fn new() -> Self {
        Self {
            l_sheets: vec![SpecSheet::default()],
            n_sheet_active: 0,
            properties: SpecDocumentProperties::default(),
        }
    }

    /// Append a new empty sheet; returns its index.
    pub fn create_sheet(&mut self) -> usize {
        self.l_sheets.push(SpecSheet::default());
        self.l_sheets.len() - 1
    }

    /// Switch the active sheet.
    pub fn set_active_sheet(&mut self, n_idx_sheet: usize) -> Result<(), SheetError> {
        if n_idx_sheet >= self.l_sheets.len() {
            return Err(SheetError::SheetIndex(n_idx_sheet));
        }
        self.n_sheet_active = n_idx_sheet;
        Ok(())
    }

    /// Index of the active sheet.
    pub fn active_sheet_index(&self) -> usize {
        self.n_sheet_active
    }

    /// Borrow the active sheet.
    pub fn active_sheet(&self) -> &SpecSheet {
        &self.l_sheets[self.n_sheet_active]
    }

    /// Mutably borrow the active sheet.
    pub fn active_sheet_mut(&mut self) -> &mut SpecSheet {
        &mut self.l_sheets[self.n_sheet_active]
    }

    /// All sheets in creation order.
    pub fn sheets(&self) -> &[SpecSheet] {
        &self.l_sheets
    }

    /// Set the active sheet's title.
    pub fn set_sheet_title(&mut self, title: &str) {
        self.active_sheet_mut().title = Some(title.to_string());
    }

    /// Set cell content on the active sheet.
    pub fn set_cell_value(&mut self, coord: SpecCellCoordinate, value: EnumCellValue) {
        self.active_sheet_mut().set_cell_value(coord, value);
    }

    /// Apply a style block on the active sheet (see [`SpecSheet::apply_cell_style`]).
    pub fn apply_cell_style(
        &mut self,
        coord: SpecCellCoordinate,
        style: &SpecCellStyle,
    ) -> Result<(), SheetError> {
        self.active_sheet_mut().apply_cell_style(coord, style)
    }

    /// Merge a range on the active sheet.
    pub fn merge_cells(&mut self, range: SpecCellRange) -> Result<(), SheetError> {
        self.active_sheet_mut().merge_cells(range)
    }

    /// Set column sizing directives on the active sheet.
    pub fn set_column_dimension(&mut self, n_idx_col: usize, dimension: SpecColumnDimension) {
        self.active_sheet_mut()
            .set_column_dimension(n_idx_col, dimension);
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
