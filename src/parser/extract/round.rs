use std::fmt;

use serde::Serialize;

use crate::parser::document::Node;

const ROUND_SUFFIX: &str = "_round";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Round {
    #[serde(rename = "Jeopardy!")]
    Jeopardy,
    #[serde(rename = "Double Jeopardy!")]
    DoubleJeopardy,
    #[serde(rename = "Final Jeopardy!")]
    FinalJeopardy,
}

impl Round {
    /// Map a round container id to its round. Unknown ids yield `None`.
    pub fn from_container_id(id: &str) -> Option<Self> {
        match id {
            "jeopardy_round" => Some(Self::Jeopardy),
            "double_jeopardy_round" => Some(Self::DoubleJeopardy),
            "final_jeopardy_round" => Some(Self::FinalJeopardy),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Jeopardy => "Jeopardy!",
            Self::DoubleJeopardy => "Double Jeopardy!",
            Self::FinalJeopardy => "Final Jeopardy!",
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn is_round_container(node: &Node) -> bool {
    node.tag() == "div" && node.id().is_some_and(|id| id.ends_with(ROUND_SUFFIX))
}

/// Nearest enclosing `div` whose id ends in `_round`.
pub fn round_container<'a>(clue: &Node<'a>) -> Option<Node<'a>> {
    clue.find_ancestor(is_round_container)
}

/// Round of the nearest round container only; an unrecognised id does not
/// fall through to an outer container.
pub fn resolve(container: Option<&Node>) -> Option<Round> {
    container.and_then(|c| c.id()).and_then(Round::from_container_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::document::Document;
    use scraper::Selector;

    fn round_of(html: &str) -> Option<Round> {
        let doc = Document::parse(html);
        let clue = doc.select_first(&Selector::parse("td.clue").unwrap()).unwrap();
        resolve(round_container(&clue).as_ref())
    }

    #[test]
    fn known_ids() {
        assert_eq!(Round::from_container_id("jeopardy_round"), Some(Round::Jeopardy));
        assert_eq!(Round::from_container_id("double_jeopardy_round"), Some(Round::DoubleJeopardy));
        assert_eq!(Round::from_container_id("final_jeopardy_round"), Some(Round::FinalJeopardy));
    }

    #[test]
    fn unknown_ids() {
        for id in ["", "jeopardy", "tiebreaker_round", "Jeopardy_Round", "jeopardy_round_2", "final_round"] {
            assert_eq!(Round::from_container_id(id), None, "{id}");
        }
    }

    #[test]
    fn labels() {
        assert_eq!(Round::Jeopardy.to_string(), "Jeopardy!");
        assert_eq!(Round::DoubleJeopardy.to_string(), "Double Jeopardy!");
        assert_eq!(Round::FinalJeopardy.to_string(), "Final Jeopardy!");
    }

    #[test]
    fn nearest_container_wins() {
        let html = r#"<div id="jeopardy_round"><div id="mystery_round">
            <table><tr><td class="clue">x</td></tr></table></div></div>"#;
        assert_eq!(round_of(html), None);
    }

    #[test]
    fn non_round_divs_are_skipped() {
        let html = r#"<div id="double_jeopardy_round"><div id="wrapper">
            <table><tr><td class="clue">x</td></tr></table></div></div>"#;
        assert_eq!(round_of(html), Some(Round::DoubleJeopardy));
    }

    #[test]
    fn no_container() {
        assert_eq!(round_of(r#"<table><tr><td class="clue">x</td></tr></table>"#), None);
    }

    #[test]
    fn serializes_as_label() {
        assert_eq!(serde_json::to_string(&Round::FinalJeopardy).unwrap(), "\"Final Jeopardy!\"");
    }
}
