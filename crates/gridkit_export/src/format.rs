//! Display-format taxonomy and the injectable value formatter.

use gridkit_sheet::EnumCellValue;

use crate::conf::{N_DIGITS_CURRENCY_DEFAULT, N_DIGITS_DECIMAL_DEFAULT};

////////////////////////////////////////////////////////////////////////////////
// #region FormatTaxonomy

/// Display format of one column's data cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumValueFormat {
    /// Pass the derived value through untouched.
    #[default]
    Raw,
    /// Render as plain text.
    Text,
    /// Grouped integer display (`9,879`).
    Integer,
    /// Grouped decimal display with fixed digits (`9,879.0000`).
    Decimal(usize),
    /// Scientific display (`9.88E3`).
    Scientific,
    /// Currency display (`$9,879.00`).
    Currency,
}

/// Resolve a shorthand format name. The empty name maps to [`EnumValueFormat::Raw`];
/// unknown names are rejected at configuration time.
pub fn parse_value_format(name: &str) -> Result<EnumValueFormat, String> {
    match name.trim().to_ascii_lowercase().as_str() {
        "" | "raw" => Ok(EnumValueFormat::Raw),
        "text" => Ok(EnumValueFormat::Text),
        "integer" => Ok(EnumValueFormat::Integer),
        "decimal" => Ok(EnumValueFormat::Decimal(N_DIGITS_DECIMAL_DEFAULT)),
        "scientific" => Ok(EnumValueFormat::Scientific),
        "currency" => Ok(EnumValueFormat::Currency),
        _ => Err(format!("Unknown value format: {name:?}")),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Formatter

/// Locale-style display formatter for data cell values.
///
/// Always injected explicitly: the exporter owns a defaulted instance and
/// never resolves one from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecValueFormatter {
    /// Thousands group separator.
    pub sep_thousands: String,
    /// Decimal separator.
    pub sep_decimal: String,
    /// Currency symbol prefix.
    pub currency_symbol: String,
}

impl Default for SpecValueFormatter {
    fn default() -> Self {
        Self {
            sep_thousands: ",".to_string(),
            sep_decimal: ".".to_string(),
            currency_symbol: "$".to_string(),
        }
    }
}

impl SpecValueFormatter {
    /// Format one derived value for display.
    ///
    /// [`EnumValueFormat::Raw`] passes the value through with its type
    /// intact; every other format produces text. Missing values pass
    /// through untouched (the render layer substitutes its null-display
    /// placeholder before formatting).
    pub fn format_value(
        &self,
        value: &EnumCellValue,
        format: &EnumValueFormat,
    ) -> Result<EnumCellValue, String> {
        if value.is_none() {
            return Ok(EnumCellValue::None);
        }

        match format {
            EnumValueFormat::Raw => Ok(value.clone()),
            EnumValueFormat::Text => Ok(EnumCellValue::Text(value.to_display_string())),
            EnumValueFormat::Integer => {
                let number = derive_f64_value(value, "integer")?;
                Ok(EnumCellValue::Text(self.format_grouped(number.trunc(), 0)))
            }
            EnumValueFormat::Decimal(n_digits) => {
                let number = derive_f64_value(value, "decimal")?;
                Ok(EnumCellValue::Text(self.format_grouped(number, *n_digits)))
            }
            EnumValueFormat::Scientific => {
                let number = derive_f64_value(value, "scientific")?;
                Ok(EnumCellValue::Text(format!("{number:.2E}")))
            }
            EnumValueFormat::Currency => {
                let number = derive_f64_value(value, "currency")?;
                let c_amount = self.format_grouped(number.abs(), N_DIGITS_CURRENCY_DEFAULT);
                let c_sign = if number < 0.0 { "-" } else { "" };
                Ok(EnumCellValue::Text(format!(
                    "{c_sign}{}{c_amount}",
                    self.currency_symbol
                )))
            }
        }
    }

    /// Fixed-digit decimal display with thousands grouping.
    fn format_grouped(&self, number: f64, n_digits: usize) -> String {
        let if_negative = number < 0.0;
        let c_fixed = format!("{:.*}", n_digits, number.abs());
        let (c_int_part, c_frac_part) = match c_fixed.split_once('.') {
            Some((int_part, frac_part)) => (int_part.to_string(), Some(frac_part.to_string())),
            None => (c_fixed, None),
        };

        let l_digits: Vec<char> = c_int_part.chars().collect();
        let mut c_grouped = String::new();
        for (n_idx, chr) in l_digits.iter().enumerate() {
            if n_idx > 0 && (l_digits.len() - n_idx) % 3 == 0 {
                c_grouped.push_str(&self.sep_thousands);
            }
            c_grouped.push(*chr);
        }

        let mut c_result = String::new();
        if if_negative {
            c_result.push('-');
        }
        c_result.push_str(&c_grouped);
        if let Some(c_frac) = c_frac_part {
            c_result.push_str(&self.sep_decimal);
            c_result.push_str(&c_frac);
        }
        c_result
    }
}

fn derive_f64_value(value: &EnumCellValue, format_name: &str) -> Result<f64, String> {
    match value {
        EnumCellValue::Number(number) => Ok(*number),
        EnumCellValue::Text(text) => text.parse::<f64>().map_err(|_| {
            format!("Cannot apply {format_name} format to non-numeric value {text:?}")
        }),
        _ => Err(format!(
            "Cannot apply {format_name} format to value {value:?}"
        )),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_format() {
        assert_eq!(parse_value_format(""), Ok(EnumValueFormat::Raw));
        assert_eq!(parse_value_format("raw"), Ok(EnumValueFormat::Raw));
        assert_eq!(parse_value_format("currency"), Ok(EnumValueFormat::Currency));
        assert_eq!(
            parse_value_format("decimal"),
            Ok(EnumValueFormat::Decimal(4))
        );
        assert!(parse_value_format("bogus").is_err());
    }

    #[test]
    fn test_raw_passes_value_through_typed() {
        let formatter = SpecValueFormatter::default();
        assert_eq!(
            formatter.format_value(&EnumCellValue::Number(12.5), &EnumValueFormat::Raw),
            Ok(EnumCellValue::Number(12.5))
        );
    }

    #[test]
    fn test_integer_format_groups_and_truncates() {
        let formatter = SpecValueFormatter::default();
        assert_eq!(
            formatter.format_value(&EnumCellValue::Number(9879.6), &EnumValueFormat::Integer),
            Ok(EnumCellValue::Text("9,879".to_string()))
        );
        assert_eq!(
            formatter.format_value(
                &EnumCellValue::Text("1234567".to_string()),
                &EnumValueFormat::Integer
            ),
            Ok(EnumCellValue::Text("1,234,567".to_string()))
        );
    }

    #[test]
    fn test_decimal_format_uses_fixed_digits() {
        let formatter = SpecValueFormatter::default();
        assert_eq!(
            formatter.format_value(&EnumCellValue::Number(9879.0), &EnumValueFormat::Decimal(4)),
            Ok(EnumCellValue::Text("9,879.0000".to_string()))
        );
    }

    #[test]
    fn test_currency_format() {
        let formatter = SpecValueFormatter::default();
        assert_eq!(
            formatter.format_value(&EnumCellValue::Number(9879.0), &EnumValueFormat::Currency),
            Ok(EnumCellValue::Text("$9,879.00".to_string()))
        );
        assert_eq!(
            formatter.format_value(&EnumCellValue::Number(-42.5), &EnumValueFormat::Currency),
            Ok(EnumCellValue::Text("-$42.50".to_string()))
        );
    }

    #[test]
    fn test_scientific_format() {
        let formatter = SpecValueFormatter::default();
        assert_eq!(
            formatter.format_value(&EnumCellValue::Number(9879.0), &EnumValueFormat::Scientific),
            Ok(EnumCellValue::Text("9.88E3".to_string()))
        );
    }

    #[test]
    fn test_text_format_renders_bools() {
        let formatter = SpecValueFormatter::default();
        assert_eq!(
            formatter.format_value(&EnumCellValue::Bool(true), &EnumValueFormat::Text),
            Ok(EnumCellValue::Text("true".to_string()))
        );
    }

    #[test]
    fn test_numeric_format_rejects_non_numeric_text() {
        let formatter = SpecValueFormatter::default();
        assert!(
            formatter
                .format_value(
                    &EnumCellValue::Text("n/a".to_string()),
                    &EnumValueFormat::Integer
                )
                .is_err()
        );
    }

    #[test]
    fn test_missing_value_passes_through() {
        let formatter = SpecValueFormatter::default();
        assert_eq!(
            formatter.format_value(&EnumCellValue::None, &EnumValueFormat::Currency),
            Ok(EnumCellValue::None)
        );
    }
}
