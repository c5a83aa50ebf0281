//! Stateless helpers: coordinates, sheet names, color normalization.

use std::collections::BTreeSet;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};

////////////////////////////////////////////////////////////////////////////////
// #region Coordinates

/// Convert zero-based column index to spreadsheet letters (`0 -> A`, `26 -> AA`).
pub fn derive_column_letters_from_index(n_idx_col: usize) -> String {
    let mut l_letters = Vec::new();
    let mut n_rest = n_idx_col;
    loop {
        l_letters.push(b'A' + (n_rest % 26) as u8);
        if n_rest < 26 {
            break;
        }
        n_rest = n_rest / 26 - 1;
    }
    l_letters.reverse();
    String::from_utf8(l_letters).unwrap_or_default()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNames

/// Replace invalid chars and trim to a valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Derive a sheet name not yet present in `set_names_existing`, registering
/// the result before returning it.
pub fn derive_unique_sheet_name(
    name: &str,
    set_names_existing: &mut BTreeSet<String>,
) -> String {
    if !set_names_existing.contains(name) {
        set_names_existing.insert(name.to_string());
        return name.to_string();
    }

    let base_name: String = name
        .chars()
        .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
        .collect();

    let mut n_idx = 2usize;
    loop {
        let candidate: String = format!("{base_name}__{n_idx}")
            .chars()
            .take(N_LEN_EXCEL_SHEET_NAME_MAX)
            .collect();
        if !set_names_existing.contains(&candidate) {
            set_names_existing.insert(candidate.clone());
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Colors

/// Normalize a `RRGGBB` / `#RRGGBB` color string to bare uppercase hex.
pub fn normalize_color_hex(color: &str) -> Result<String, String> {
    let c_hex = color.strip_prefix('#').unwrap_or(color);
    if c_hex.len() != 6 || !c_hex.chars().all(|chr| chr.is_ascii_hexdigit()) {
        return Err(format!("Invalid color value: {color:?}"));
    }
    Ok(c_hex.to_ascii_uppercase())
}

/// Parse a normalized color into its RGB numeric value.
pub fn derive_rgb_from_hex(color: &str) -> Result<u32, String> {
    let c_hex = normalize_color_hex(color)?;
    u32::from_str_radix(&c_hex, 16).map_err(|err| format!("Invalid color value {color:?}: {err}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
