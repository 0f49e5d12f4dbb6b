use std::sync::LazyLock;

use scraper::Selector;

use super::round::{self, Round};
use crate::parser::document::Node;

static CATEGORY_NAME_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.category .category_name").unwrap());
static FINAL_ROUND_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.final_round").unwrap());

/// A clue cell: a `td` carrying the `clue` class. Spacer and filler cells in
/// the same row do not count toward a clue's column.
pub fn is_clue_container(node: &Node) -> bool {
    node.tag() == "td" && node.has_class("clue")
}

fn is_round_table(node: &Node) -> bool {
    node.tag() == "table" && node.has_class("round")
}

/// Table whose category headers govern `clue`: the nearest enclosing round
/// table, or, inside the final-round container only, the final-round table
/// nested in it.
pub fn scope<'a>(clue: &Node<'a>, round_container: Option<&Node<'a>>) -> Option<Node<'a>> {
    clue.find_ancestor(is_round_table).or_else(|| {
        round_container
            .filter(|c| round::resolve(Some(*c)) == Some(Round::FinalJeopardy))
            .and_then(|c| c.select_first(&FINAL_ROUND_SEL))
    })
}

/// Category names within `scope`, in document order.
pub fn names(scope: &Node) -> Vec<String> {
    scope.select(&CATEGORY_NAME_SEL).map(|n| n.text()).collect()
}

/// Zero-based position of `clue` among the clue cells of its row. `None`
/// when `clue` is not itself a clue cell of that row.
pub fn column_index(clue: &Node) -> Option<usize> {
    let row = clue.parent()?;
    row.child_elements()
        .filter(is_clue_container)
        .position(|cell| cell == *clue)
}

/// `categories[column]` when in range; anything else is `None`.
pub fn at_column(categories: &[String], column: usize) -> Option<&str> {
    categories.get(column).map(String::as_str)
}

pub fn resolve(clue: &Node, round_container: Option<&Node>) -> Option<String> {
    let scope = scope(clue, round_container)?;
    let categories = names(&scope);
    let column = column_index(clue)?;
    at_column(&categories, column).map(str::to_string)
}
