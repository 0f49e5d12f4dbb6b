use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

pub const DEFAULT_SOURCES: &[&str] = &["https://j-archive.com/showgame.php?game_id=6680"];
const GAME_URL_PREFIX: &str = "https://j-archive.com/showgame.php?game_id=";
const DEFAULT_DB_PATH: &str = "data.sqlite";
const DEFAULT_CONCURRENCY: usize = 4;

static GAME_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?&]game_id=(\d+)").unwrap());
static BARE_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// Pipeline settings, resolved once and passed to each command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: Vec<String>,
    pub db_path: PathBuf,
    pub concurrency: usize,
}

/// Raw `MORPH_*` environment values.
#[derive(Debug, Default, Deserialize)]
struct EnvSettings {
    start_urls: Option<String>,
    db_path: Option<PathBuf>,
    concurrency: Option<usize>,
}

impl Settings {
    /// Read `MORPH_START_URLS`, `MORPH_DB_PATH` and `MORPH_CONCURRENCY`.
    pub fn from_env() -> Result<Self> {
        let env: EnvSettings = config::Config::builder()
            .add_source(config::Environment::with_prefix("MORPH").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Invalid MORPH_* environment settings")?;
        Ok(Self::from_parts(env.start_urls.as_deref(), env.db_path, env.concurrency))
    }

    pub fn from_parts(
        start_urls: Option<&str>,
        db_path: Option<PathBuf>,
        concurrency: Option<usize>,
    ) -> Self {
        let mut sources = start_urls.map(parse_source_list).unwrap_or_default();
        if sources.is_empty() {
            sources = DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect();
        }
        Self {
            sources,
            db_path: db_path.unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            concurrency: concurrency.filter(|&n| n > 0).unwrap_or(DEFAULT_CONCURRENCY),
        }
    }

    /// Sources named on the command line replace the configured list.
    pub fn with_sources(mut self, cli_sources: &[String]) -> Self {
        let sources = parse_source_list(&cli_sources.join(" "));
        if !sources.is_empty() {
            self.sources = sources;
        }
        self
    }
}

/// Split a space- or newline-delimited source list. Bare game ids expand to
/// full game URLs; repeats keep their first position.
pub fn parse_source_list(raw: &str) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for token in raw.split_whitespace() {
        let url = if BARE_ID_RE.is_match(token) {
            format!("{}{}", GAME_URL_PREFIX, token)
        } else {
            token.to_string()
        };
        if !sources.contains(&url) {
            sources.push(url);
        }
    }
    sources
}

pub fn game_id(url: &str) -> Option<String> {
    GAME_ID_RE.captures(url).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_and_newlines() {
        let raw = "  https://j-archive.com/showgame.php?game_id=1\n\nhttps://j-archive.com/showgame.php?game_id=2\t ";
        assert_eq!(
            parse_source_list(raw),
            vec![
                "https://j-archive.com/showgame.php?game_id=1",
                "https://j-archive.com/showgame.php?game_id=2",
            ]
        );
    }

    #[test]
    fn bare_ids_expand() {
        assert_eq!(
            parse_source_list("6680 6681"),
            vec![
                "https://j-archive.com/showgame.php?game_id=6680",
                "https://j-archive.com/showgame.php?game_id=6681",
            ]
        );
    }

    #[test]
    fn duplicates_removed() {
        let raw = "6680 https://j-archive.com/showgame.php?game_id=6680 6681 6680";
        assert_eq!(parse_source_list(raw).len(), 2);
    }

    #[test]
    fn defaults() {
        let s = Settings::from_parts(None, None, None);
        assert_eq!(s.sources, DEFAULT_SOURCES);
        assert_eq!(s.db_path, PathBuf::from("data.sqlite"));
        assert_eq!(s.concurrency, 4);
    }

    #[test]
    fn blank_env_falls_back() {
        let s = Settings::from_parts(Some(" \n "), None, Some(0));
        assert_eq!(s.sources, DEFAULT_SOURCES);
        assert_eq!(s.concurrency, 4);
    }

    #[test]
    fn cli_overrides_env() {
        let s = Settings::from_parts(Some("1 2"), Some("x.sqlite".into()), Some(8))
            .with_sources(&["3".to_string()]);
        assert_eq!(s.sources, vec!["https://j-archive.com/showgame.php?game_id=3"]);
        assert_eq!(s.db_path, PathBuf::from("x.sqlite"));
        assert_eq!(s.concurrency, 8);

        let unchanged = Settings::from_parts(Some("1"), None, None).with_sources(&[]);
        assert_eq!(unchanged.sources, vec!["https://j-archive.com/showgame.php?game_id=1"]);
    }

    #[test]
    fn game_ids() {
        assert_eq!(game_id("https://j-archive.com/showgame.php?game_id=6680").as_deref(), Some("6680"));
        assert_eq!(game_id("https://example.com/x?a=1&game_id=42").as_deref(), Some("42"));
        assert_eq!(game_id("https://example.com/"), None);
    }
}
