//! Stateless export helpers.

use convert_case::{Case, Casing};

/// Humanize an attribute name into a header label (`unit_price` /
/// `unitPrice` -> `Unit Price`).
pub fn humanize_attribute_label(attribute: &str) -> String {
    attribute.to_case(Case::Title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_attribute_label() {
        assert_eq!(humanize_attribute_label("unit_price"), "Unit Price");
        assert_eq!(humanize_attribute_label("unitPrice"), "Unit Price");
        assert_eq!(humanize_attribute_label("id"), "Id");
    }
}
