//! Column registry: shorthand parsing, column guessing and resolution of
//! raw configuration into the ordered visible column list.

use log::debug;
use regex::Regex;

use crate::error::ExportError;
use crate::format::parse_value_format;
use crate::spec::{EnumColumnConfig, EnumColumnValue, SpecColumn, SpecRecord};

/// Shorthand grammar: `attribute[:format[:label]]`.
const C_PATTERN_SHORTHAND: &str = r"^([^:]+)(:(\w*))?(:(.*))?$";

/// Parse a shorthand column string into a structured column.
///
/// The format segment defaults to raw passthrough; a present-but-empty
/// segment (`"price:"`) also maps to raw. A missing label leaves the header
/// unset so it is auto-derived from the attribute.
pub fn parse_column_shorthand(text: &str) -> Result<SpecColumn, ExportError> {
    let regex = Regex::new(C_PATTERN_SHORTHAND)
        .map_err(|err| ExportError::Configuration(format!("Invalid shorthand pattern: {err}")))?;

    let Some(captures) = regex.captures(text) else {
        return Err(ExportError::Configuration(format!(
            "The column must be specified in the format of \"attribute\", \
             \"attribute:format\" or \"attribute:format:label\": got {text:?}"
        )));
    };

    let c_attribute = captures
        .get(1)
        .map(|cap| cap.as_str().to_string())
        .unwrap_or_default();
    let format = match captures.get(3) {
        Some(cap) => parse_value_format(cap.as_str()).map_err(ExportError::Configuration)?,
        None => parse_value_format("").map_err(ExportError::Configuration)?,
    };
    let header = captures.get(5).map(|cap| cap.as_str().to_string());

    Ok(SpecColumn {
        header,
        value: EnumColumnValue::Attribute(c_attribute),
        format,
        ..Default::default()
    })
}

/// Derive one column config per field of `record`, in record field order.
pub fn guess_columns(record: &SpecRecord) -> Vec<EnumColumnConfig> {
    record
        .field_names()
        .into_iter()
        .map(|name| EnumColumnConfig::Shorthand(name.to_string()))
        .collect()
}

/// Resolve raw column configuration into the ordered list of constructed
/// columns, bound to `sample` when the configuration is empty.
///
/// Visibility is evaluated after full construction; invisible columns are
/// removed from the returned list and never occupy a physical slot.
pub fn resolve_columns(
    l_config: &[EnumColumnConfig],
    sample: Option<&SpecRecord>,
) -> Result<Vec<SpecColumn>, ExportError> {
    let l_effective: Vec<EnumColumnConfig> = if l_config.is_empty() {
        match sample {
            Some(record) => guess_columns(record),
            None => Vec::new(),
        }
    } else {
        l_config.to_vec()
    };

    let mut l_columns = Vec::with_capacity(l_effective.len());
    for config in &l_effective {
        let column = match config {
            EnumColumnConfig::Shorthand(text) => parse_column_shorthand(text)?,
            EnumColumnConfig::Spec(column) => column.clone(),
        };
        l_columns.push(column);
    }

    let n_total = l_columns.len();
    l_columns.retain(|column| column.if_visible);
    if l_columns.len() != n_total {
        debug!(
            "resolved columns: {} visible of {n_total} configured",
            l_columns.len()
        );
    }
    Ok(l_columns)
}
