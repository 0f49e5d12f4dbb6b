use std::sync::LazyLock;

use scraper::Selector;

use crate::parser::document::Node;

static VALUE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".clue_value, .clue_value_daily_double").unwrap());

const DAILY_DOUBLE_MARKER: &str = "DD:";

pub struct ClueValue {
    pub value: Option<String>,
    pub is_daily_double: bool,
}

pub fn extract(clue: &Node) -> ClueValue {
    let value = clue
        .select_first(&VALUE_SEL)
        .map(|n| n.text())
        .filter(|t| !t.is_empty());
    let is_daily_double = value.as_deref().is_some_and(is_daily_double);
    ClueValue {
        value,
        is_daily_double,
    }
}

/// Plain substring test on the display text, e.g. `"DD: $1,000"`.
pub fn is_daily_double(text: &str) -> bool {
    text.contains(DAILY_DOUBLE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::document::Document;

    fn value_of(cell: &str) -> ClueValue {
        let html = format!(r#"<table><tr><td class="clue">{cell}</td></tr></table>"#);
        let doc = Document::parse(&html);
        let clue = doc.select_first(&Selector::parse("td.clue").unwrap()).unwrap();
        extract(&clue)
    }

    #[test]
    fn marker() {
        assert!(is_daily_double("DD: $800"));
        assert!(is_daily_double("xxDD:"));
        assert!(!is_daily_double("$800"));
        assert!(!is_daily_double("DD $800"));
        assert!(!is_daily_double("dd: $800"));
        assert!(!is_daily_double(""));
    }

    #[test]
    fn plain_value() {
        let v = value_of(r#"<table class="clue_header"><tr><td class="clue_value">$400</td></tr></table>"#);
        assert_eq!(v.value.as_deref(), Some("$400"));
        assert!(!v.is_daily_double);
    }

    #[test]
    fn daily_double_value() {
        let v = value_of(
            r#"<table class="clue_header"><tr><td class="clue_value_daily_double">DD:  $1,000</td></tr></table>"#,
        );
        assert_eq!(v.value.as_deref(), Some("DD: $1,000"));
        assert!(v.is_daily_double);
    }

    #[test]
    fn daily_double_class_without_marker() {
        let v = value_of(r#"<table><tr><td class="clue_value_daily_double">$1,000</td></tr></table>"#);
        assert_eq!(v.value.as_deref(), Some("$1,000"));
        assert!(!v.is_daily_double);
    }

    #[test]
    fn missing_value() {
        let v = value_of(r#"<table><tr><td class="clue_text">q</td></tr></table>"#);
        assert!(v.value.is_none());
        assert!(!v.is_daily_double);
    }
}
