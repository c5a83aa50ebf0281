//! Document writers: format resolution plus XLSX and CSV encoders.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use log::{debug, warn};
use rust_xlsxwriter::{
    Color, DocProperties, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError,
};

use crate::conf::{
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_WIDTH_AUTO_MAX, N_WIDTH_AUTO_MIN, N_WIDTH_AUTO_PAD,
};
use crate::document::{SpecCellCoordinate, SpecDocument, SpecSheet};
use crate::spec::{
    EnumBorderLine, EnumCellValue, EnumHorizontalAlign, EnumVerticalAlign, SheetError,
    SpecCellStyle,
};
use crate::util::{derive_rgb_from_hex, derive_unique_sheet_name, sanitize_sheet_name};

////////////////////////////////////////////////////////////////////////////////
// #region FormatRegistry

/// Registered output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumWriterFormat {
    /// Office Open XML workbook.
    Xlsx,
    /// Comma-separated values, first sheet only.
    Csv,
}

/// Resolve a writer format from an explicit name (`"xlsx"`, `"csv"`).
pub fn parse_writer_format(name: &str) -> Result<EnumWriterFormat, SheetError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "xlsx" => Ok(EnumWriterFormat::Xlsx),
        "csv" => Ok(EnumWriterFormat::Csv),
        _ => Err(SheetError::UnknownWriterFormat(name.to_string())),
    }
}

/// Resolve a writer format from a destination file extension.
pub fn derive_writer_format_from_extension(path: &Path) -> Result<EnumWriterFormat, SheetError> {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return Err(SheetError::UnknownWriterFormat(
            path.to_string_lossy().to_string(),
        ));
    };
    parse_writer_format(extension)
}

/// Encode `document` into a file at `path` using `format`.
pub fn write_document(
    document: &SpecDocument,
    path: &Path,
    format: EnumWriterFormat,
) -> Result<(), SheetError> {
    debug!("write_document: path={} format={format:?}", path.display());
    match format {
        EnumWriterFormat::Xlsx => {
            let mut workbook = build_xlsx_workbook(document)?;
            workbook.save(path).map_err(derive_xlsx_write_error)
        }
        EnumWriterFormat::Csv => {
            let file = fs::File::create(path)
                .map_err(|err| SheetError::Io(format!("Failed to create {}: {err}", path.display())))?;
            write_csv_into(document, file)
        }
    }
}

/// Encode `document` into an in-memory byte buffer using `format`.
pub fn write_document_to_vec(
    document: &SpecDocument,
    format: EnumWriterFormat,
) -> Result<Vec<u8>, SheetError> {
    match format {
        EnumWriterFormat::Xlsx => {
            let mut workbook = build_xlsx_workbook(document)?;
            workbook.save_to_buffer().map_err(derive_xlsx_write_error)
        }
        EnumWriterFormat::Csv => {
            let mut v_bytes = Vec::new();
            write_csv_into(document, &mut v_bytes)?;
            Ok(v_bytes)
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region XlsxEncoder

fn build_xlsx_workbook(document: &SpecDocument) -> Result<Workbook, SheetError> {
    let mut workbook = Workbook::new();
    apply_document_properties(&mut workbook, document);

    let mut set_sheet_names = BTreeSet::new();
    for sheet in document.sheets() {
        let worksheet = workbook.add_worksheet();
        if let Some(title) = &sheet.title {
            let c_name_clean = sanitize_sheet_name(title, "_");
            if c_name_clean != *title {
                warn!("sheet title {title:?} normalized to {c_name_clean:?}");
            }
            let c_name_unique = derive_unique_sheet_name(&c_name_clean, &mut set_sheet_names);
            worksheet
                .set_name(&c_name_unique)
                .map_err(derive_xlsx_write_error)?;
        }
        encode_sheet_xlsx(worksheet, sheet)?;
    }

    Ok(workbook)
}

fn apply_document_properties(workbook: &mut Workbook, document: &SpecDocument) {
    let spec = &document.properties;
    if *spec == crate::spec::SpecDocumentProperties::default() {
        return;
    }

    let mut properties = DocProperties::new();
    if let Some(value) = &spec.title {
        properties = properties.set_title(value.as_str());
    }
    if let Some(value) = &spec.subject {
        properties = properties.set_subject(value.as_str());
    }
    if let Some(value) = &spec.creator {
        properties = properties.set_author(value.as_str());
    }
    if let Some(value) = &spec.description {
        properties = properties.set_comment(value.as_str());
    }
    if let Some(value) = &spec.keywords {
        properties = properties.set_keywords(value.as_str());
    }
    if let Some(value) = &spec.category {
        properties = properties.set_category(value.as_str());
    }
    if let Some(value) = &spec.company {
        properties = properties.set_company(value.as_str());
    }
    workbook.set_properties(&properties);
}

fn encode_sheet_xlsx(worksheet: &mut Worksheet, sheet: &SpecSheet) -> Result<(), SheetError> {
    // Merge ranges go in first with a blank anchor; the anchor cell is then
    // overwritten by the regular cell pass below.
    for range in sheet.merges() {
        let anchor_style = sheet
            .cell(&range.start)
            .map(|cell| cell.style.clone())
            .unwrap_or_default();
        let format = derive_rust_xlsx_format(&anchor_style)?;
        worksheet
            .merge_range(
                cast_row_num(range.start.n_row)?,
                cast_col_num(range.start.n_col)?,
                cast_row_num(range.end.n_row)?,
                cast_col_num(range.end.n_col)?,
                "",
                &format,
            )
            .map_err(derive_xlsx_write_error)?;
    }

    for ((n_row, n_col), cell) in sheet.cells() {
        let coord = SpecCellCoordinate::new(*n_col, *n_row);
        if sheet.is_merge_covered(&coord) {
            continue;
        }
        let format = derive_rust_xlsx_format(&cell.style)?;
        write_cell_with_format(
            worksheet,
            cast_row_num(*n_row)?,
            cast_col_num(*n_col)?,
            &cell.value,
            &format,
            cell.style.is_empty(),
        )?;
    }

    apply_column_dimensions_xlsx(worksheet, sheet)?;
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    n_row: u32,
    n_col: u16,
    value: &EnumCellValue,
    format: &Format,
    if_style_empty: bool,
) -> Result<(), SheetError> {
    match value {
        EnumCellValue::None => {
            if !if_style_empty {
                worksheet
                    .write_blank(n_row, n_col, format)
                    .map_err(derive_xlsx_write_error)?;
            }
        }
        EnumCellValue::Text(text) if text.is_empty() => {
            if !if_style_empty {
                worksheet
                    .write_blank(n_row, n_col, format)
                    .map_err(derive_xlsx_write_error)?;
            }
        }
        EnumCellValue::Text(text) => {
            worksheet
                .write_string_with_format(n_row, n_col, text, format)
                .map_err(derive_xlsx_write_error)?;
        }
        EnumCellValue::Number(number) => {
            worksheet
                .write_number_with_format(n_row, n_col, *number, format)
                .map_err(derive_xlsx_write_error)?;
        }
        EnumCellValue::Bool(flag) => {
            worksheet
                .write_boolean_with_format(n_row, n_col, *flag, format)
                .map_err(derive_xlsx_write_error)?;
        }
    }
    Ok(())
}

fn apply_column_dimensions_xlsx(
    worksheet: &mut Worksheet,
    sheet: &SpecSheet,
) -> Result<(), SheetError> {
    for (n_idx_col, dimension) in sheet.column_dimensions() {
        let n_col = cast_col_num(*n_idx_col)?;
        if let Some(width) = dimension.width {
            worksheet
                .set_column_width(n_col, width)
                .map_err(derive_xlsx_write_error)?;
        } else if dimension.if_auto_size {
            let n_width = estimate_column_width(sheet, *n_idx_col);
            worksheet
                .set_column_width(n_col, n_width as f64)
                .map_err(derive_xlsx_write_error)?;
        }
        if dimension.if_hidden {
            worksheet
                .set_column_hidden(n_col)
                .map_err(derive_xlsx_write_error)?;
        }
    }
    Ok(())
}

/// Estimate displayed width units for one column from its written cells.
fn estimate_column_width(sheet: &SpecSheet, n_idx_col: usize) -> usize {
    let mut n_width = 0usize;
    for ((_, n_col), cell) in sheet.cells() {
        if *n_col != n_idx_col {
            continue;
        }
        n_width = usize::max(
            n_width,
            estimate_unicode_string_width(&cell.value.to_display_string()),
        );
    }
    usize::min(
        N_WIDTH_AUTO_MAX,
        usize::max(N_WIDTH_AUTO_MIN, n_width + N_WIDTH_AUTO_PAD),
    )
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

fn derive_rust_xlsx_format(style: &SpecCellStyle) -> Result<Format, SheetError> {
    let mut format = Format::new();

    if let Some(alignment) = style.alignment {
        if let Some(horizontal) = alignment.horizontal {
            format = format.set_align(derive_format_align_horizontal(horizontal));
        }
        if let Some(vertical) = alignment.vertical {
            format = format.set_align(derive_format_align_vertical(vertical));
        }
        if alignment.if_wrap_text {
            format = format.set_text_wrap();
        }
    }

    if let Some(font) = &style.font {
        if let Some(name) = &font.name {
            format = format.set_font_name(name.clone());
        }
        if let Some(size) = font.size {
            format = format.set_font_size(size);
        }
        if font.bold.unwrap_or(false) {
            format = format.set_bold();
        }
        if font.italic.unwrap_or(false) {
            format = format.set_italic();
        }
        if let Some(color) = &font.color {
            let rgb = derive_rgb_from_hex(color).map_err(SheetError::Style)?;
            format = format.set_font_color(Color::RGB(rgb));
        }
    }

    if let Some(border) = style.border {
        if let Some(line) = border.all {
            format = format.set_border(derive_format_border(line));
        }
        if let Some(line) = border.top {
            format = format.set_border_top(derive_format_border(line));
        }
        if let Some(line) = border.bottom {
            format = format.set_border_bottom(derive_format_border(line));
        }
        if let Some(line) = border.left {
            format = format.set_border_left(derive_format_border(line));
        }
        if let Some(line) = border.right {
            format = format.set_border_right(derive_format_border(line));
        }
    }

    if let Some(fill) = &style.fill {
        if let Some(color) = &fill.bg_color {
            let rgb = derive_rgb_from_hex(color).map_err(SheetError::Style)?;
            format = format.set_background_color(Color::RGB(rgb));
        }
    }

    if let Some(num_format) = &style.num_format {
        format = format.set_num_format(num_format.clone());
    }

    Ok(format)
}

fn derive_format_border(line: EnumBorderLine) -> FormatBorder {
    match line {
        EnumBorderLine::None => FormatBorder::None,
        EnumBorderLine::Thin => FormatBorder::Thin,
        EnumBorderLine::Medium => FormatBorder::Medium,
        EnumBorderLine::Dashed => FormatBorder::Dashed,
        EnumBorderLine::Dotted => FormatBorder::Dotted,
        EnumBorderLine::Thick => FormatBorder::Thick,
        EnumBorderLine::Double => FormatBorder::Double,
        EnumBorderLine::Hair => FormatBorder::Hair,
    }
}

fn derive_format_align_horizontal(align: EnumHorizontalAlign) -> FormatAlign {
    match align {
        EnumHorizontalAlign::General => FormatAlign::General,
        EnumHorizontalAlign::Left => FormatAlign::Left,
        EnumHorizontalAlign::Center => FormatAlign::Center,
        EnumHorizontalAlign::Right => FormatAlign::Right,
        EnumHorizontalAlign::Fill => FormatAlign::Fill,
        EnumHorizontalAlign::Justify => FormatAlign::Justify,
    }
}

fn derive_format_align_vertical(align: EnumVerticalAlign) -> FormatAlign {
    match align {
        EnumVerticalAlign::Top => FormatAlign::Top,
        EnumVerticalAlign::Center => FormatAlign::VerticalCenter,
        EnumVerticalAlign::Bottom => FormatAlign::Bottom,
    }
}

fn cast_row_num(n_row: usize) -> Result<u32, SheetError> {
    // Model rows are one-based; the encoder is zero-based.
    if n_row == 0 || n_row > N_NROWS_EXCEL_MAX {
        return Err(SheetError::Write(format!("Row index out of range: {n_row}")));
    }
    u32::try_from(n_row - 1).map_err(|_| SheetError::Write(format!("Row index overflow: {n_row}")))
}

fn cast_col_num(n_col: usize) -> Result<u16, SheetError> {
    if n_col >= N_NCOLS_EXCEL_MAX {
        return Err(SheetError::Write(format!(
            "Column index out of range: {n_col}"
        )));
    }
    u16::try_from(n_col).map_err(|_| SheetError::Write(format!("Column index overflow: {n_col}")))
}

fn derive_xlsx_write_error(err: XlsxError) -> SheetError {
    SheetError::Write(format!("xlsx: {err}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CsvEncoder

/// Encode the document's first sheet as CSV.
///
/// Merge-covered cells are emitted blank so merged content never repeats;
/// trailing empty fields are truncated, so rows may have different widths.
fn write_csv_into<W: io::Write>(document: &SpecDocument, writer: W) -> Result<(), SheetError> {
    if document.sheets().len() > 1 {
        warn!(
            "csv output keeps only the first of {} sheets",
            document.sheets().len()
        );
    }
    let sheet = &document.sheets()[0];

    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);

    let Some((n_row_max, n_col_max)) = sheet.extent() else {
        return csv_writer
            .flush()
            .map_err(|err| SheetError::Io(err.to_string()));
    };

    for n_row in 1..=n_row_max {
        let mut record: Vec<String> = Vec::new();
        let mut n_last_non_empty = 0;

        for n_col in 0..=n_col_max {
            let coord = SpecCellCoordinate::new(n_col, n_row);
            let value = if sheet.is_merge_covered(&coord) {
                String::new()
            } else {
                sheet.cell_value(&coord).to_display_string()
            };
            if !value.is_empty() {
                n_last_non_empty = n_col + 1;
            }
            record.push(value);
        }

        record.truncate(usize::max(n_last_non_empty, 1));
        csv_writer
            .write_record(&record)
            .map_err(|err| SheetError::Write(format!("csv: {err}")))?;
    }

    csv_writer
        .flush()
        .map_err(|err| SheetError::Io(err.to_string()))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
