use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

use crate::parser::extract::round::Round;

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS games (
            id         INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            game_id    TEXT,
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_games_visited ON games(visited);

        CREATE TABLE IF NOT EXISTS game_pages (
            id           INTEGER PRIMARY KEY,
            game_ref     INTEGER NOT NULL REFERENCES games(id),
            url          TEXT NOT NULL,
            html         TEXT,
            status       INTEGER,
            error        TEXT,
            latency_ms   INTEGER,
            title        TEXT,
            clue_count   INTEGER,
            processed_at TEXT,
            scraped_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_game_pages_url ON game_pages(url);

        CREATE TABLE IF NOT EXISTS clues (
            id              INTEGER PRIMARY KEY,
            game_url        TEXT NOT NULL,
            game_title      TEXT,
            round           TEXT CHECK(round IN ('Jeopardy!','Double Jeopardy!','Final Jeopardy!')),
            category        TEXT,
            value           TEXT,
            is_daily_double BOOLEAN NOT NULL DEFAULT 0,
            question        TEXT NOT NULL,
            answer          TEXT NOT NULL,
            page_ref        INTEGER REFERENCES game_pages(id),
            saved_at        TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(game_url, question)
        );
        CREATE INDEX IF NOT EXISTS idx_clues_round ON clues(round);
        ",
    )?;
    Ok(())
}

// ── Queue ──

pub fn insert_games(conn: &Connection, games: &[(String, Option<String>)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO games (url, game_id) VALUES (?1, ?2)")?;
        for (url, game_id) in games {
            count += stmt.execute(rusqlite::params![url, game_id])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub struct QueuedGame {
    pub id: i64,
    pub url: String,
    pub game_id: Option<String>,
}

pub fn fetch_unvisited(conn: &Connection, limit: Option<usize>) -> Result<Vec<QueuedGame>> {
    let sql = format!(
        "SELECT id, url, game_id FROM games WHERE visited = 0 ORDER BY id{}",
        limit_clause(limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(QueuedGame {
                id: row.get(0)?,
                url: row.get(1)?,
                game_id: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Scraping ──

pub struct FetchRow {
    pub game_ref: i64,
    pub url: String,
    pub html: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

/// Record one fetch outcome and mark the game visited.
pub fn save_fetch(conn: &Connection, row: &FetchRow) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO game_pages (game_ref, url, html, status, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            row.game_ref, row.url, row.html, row.status, row.error, row.latency_ms,
        ],
    )?;
    tx.execute(
        "UPDATE games SET visited = 1, visited_at = datetime('now') WHERE id = ?1",
        rusqlite::params![row.game_ref],
    )?;
    tx.commit()?;
    Ok(())
}

// ── Processing ──

pub struct FetchedPage {
    pub page_id: i64,
    pub url: String,
    pub html: String,
}

/// Pages that downloaded cleanly and have not been extracted yet.
pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<FetchedPage>> {
    let sql = format!(
        "SELECT id, url, html FROM game_pages
         WHERE html IS NOT NULL AND error IS NULL AND processed_at IS NULL
         ORDER BY id{}",
        limit_clause(limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FetchedPage {
                page_id: row.get(0)?,
                url: row.get(1)?,
                html: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// One clue as it appears on the board. `game_url` is the source the page
/// came from and, with `question`, forms the storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClueRecord {
    pub game_url: String,
    pub game_title: Option<String>,
    pub round: Option<Round>,
    pub category: Option<String>,
    pub value: Option<String>,
    pub is_daily_double: bool,
    pub question: String,
    pub answer: String,
}

/// Save every clue from one page and mark it processed, in one transaction.
/// A clue already stored under the same (game_url, question) is replaced.
pub fn save_clues(
    conn: &Connection,
    page_id: i64,
    title: Option<&str>,
    clues: &[ClueRecord],
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO clues
             (game_url, game_title, round, category, value, is_daily_double, question, answer, page_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for c in clues {
            count += stmt.execute(rusqlite::params![
                c.game_url,
                c.game_title,
                c.round.map(Round::label),
                c.category,
                c.value,
                c.is_daily_double,
                c.question,
                c.answer,
                page_id,
            ])?;
        }
    }
    tx.execute(
        "UPDATE game_pages SET title = ?1, clue_count = ?2, processed_at = datetime('now')
         WHERE id = ?3",
        rusqlite::params![title, clues.len(), page_id],
    )?;
    tx.commit()?;
    Ok(count)
}

// ── Overview ──

pub struct OverviewRow {
    pub round: String,
    pub category: String,
    pub value: String,
    pub is_daily_double: bool,
    pub question: String,
    pub answer: String,
}

pub fn fetch_overview(
    conn: &Connection,
    round: Option<&str>,
    game_url: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(r) = round {
        conditions.push(format!("round = ?{}", params.len() + 1));
        params.push(Box::new(r.to_string()));
    }
    if let Some(g) = game_url {
        conditions.push(format!("game_url = ?{}", params.len() + 1));
        params.push(Box::new(g.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT COALESCE(round,''), COALESCE(category,''), COALESCE(value,''),
                is_daily_double, question, answer
         FROM clues{}
         ORDER BY id
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                round: row.get(0)?,
                category: row.get(1)?,
                value: row.get(2)?,
                is_daily_double: row.get(3)?,
                question: row.get(4)?,
                answer: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub visited: usize,
    pub unvisited: usize,
    pub fetched: usize,
    pub errors: usize,
    pub processed: usize,
    pub clues: usize,
    pub daily_doubles: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };

    let total = count("SELECT COUNT(*) FROM games")?;
    let visited = count("SELECT COUNT(*) FROM games WHERE visited = 1")?;
    Ok(Stats {
        total,
        visited,
        unvisited: total - visited,
        fetched: count("SELECT COUNT(*) FROM game_pages")?,
        errors: count("SELECT COUNT(*) FROM game_pages WHERE error IS NOT NULL")?,
        processed: count("SELECT COUNT(*) FROM game_pages WHERE processed_at IS NOT NULL")?,
        clues: count("SELECT COUNT(*) FROM clues")?,
        daily_doubles: count("SELECT COUNT(*) FROM clues WHERE is_daily_double = 1")?,
    })
}

fn limit_clause(limit: Option<usize>) -> String {
    match limit {
        Some(n) => format!(" LIMIT {}", n),
        None => String::new(),
    }
}
