pub mod category;
pub mod round;
pub mod value;

use std::sync::LazyLock;

use scraper::Selector;

use super::document::{Document, Node};
use crate::db::ClueRecord;

static GAME_TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#game_title h1").unwrap());
static CLUE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.clue").unwrap());
static CLUE_TEXT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.clue_text").unwrap());
static CORRECT_RESPONSE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("em.correct_response").unwrap());

/// Walk every clue cell of a game page and rebuild its record.
///
/// Cells without a question and a correct response are dropped. Title,
/// round, category and value degrade to `None` when they cannot be resolved.
/// Output follows document order.
pub fn extract(document: &Document, game_url: &str) -> Vec<ClueRecord> {
    let game_title = game_title(document);

    document
        .select(&CLUE_SEL)
        .filter_map(|clue| extract_clue(&clue, game_url, game_title.as_deref()))
        .collect()
}

pub fn game_title(document: &Document) -> Option<String> {
    document
        .select_first(&GAME_TITLE_SEL)
        .map(|n| n.text())
        .filter(|t| !t.is_empty())
}

fn extract_clue(clue: &Node, game_url: &str, game_title: Option<&str>) -> Option<ClueRecord> {
    let (question, answer) = question_and_answer(clue)?;

    let round_container = round::round_container(clue);
    let round = round::resolve(round_container.as_ref());
    let value = value::extract(clue);
    let category = category::resolve(clue, round_container.as_ref());

    Some(ClueRecord {
        game_url: game_url.to_string(),
        game_title: game_title.map(str::to_string),
        round,
        category,
        value: value.value,
        is_daily_double: value.is_daily_double,
        question,
        answer,
    })
}

/// Question from the first text block, answer from the correct response in
/// the second. A cell must hold exactly two text blocks.
fn question_and_answer(clue: &Node) -> Option<(String, String)> {
    let blocks: Vec<Node> = clue.select(&CLUE_TEXT_SEL).collect();
    let [question_block, answer_block] = blocks.as_slice() else {
        return None;
    };

    let question = question_block.text();
    let answer = answer_block
        .select_first(&CORRECT_RESPONSE_SEL)
        .map(|n| n.text())
        .unwrap_or_default();

    if question.is_empty() || answer.is_empty() {
        return None;
    }
    Some((question, answer))
}
