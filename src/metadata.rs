//! Game metadata from the per-game `index.html`
//!
//! Game pages list their facts as `<b>Label:</b> value` pairs. The short
//! summary shown in tooltips is built from five of them; the detail view gets
//! the whole page converted to plain text.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Name of the per-game description page
pub const INDEX_FILE: &str = "index.html";

/// Value shown for any field that can't be found
pub const UNKNOWN: &str = "???";

/// Summary used when a game has no readable `index.html`
pub const SUMMARY_UNAVAILABLE: &str = "Description unavailable.";

/// Page shown in the detail view when `index.html` is missing or unreadable
pub const DESCRIPTION_UNAVAILABLE_HTML: &str = "<h1>Description unavailable</h1>\
<p>index.html was not found or could not be read.</p>";

// Each field is recognised by its English label or the Russian one used by
// the stock game pages.
const DEVELOPER: &[&str] = &["Developer", "Разработчик"];
const RELEASE_DATE: &[&str] = &["Release Date", "Дата выхода"];
const LANGUAGE: &[&str] = &["Game Language", "Язык игры"];
const PLAYERS: &[&str] = &["Player Count", "Количество игроков"];
const DETAILS: &[&str] = &["Additional Details", "Доп. детали"];
const GENRE: &[&str] = &["Genre", "Жанр"];

struct Patterns {
    developer: Option<Regex>,
    release_date: Option<Regex>,
    language: Option<Regex>,
    players: Option<Regex>,
    details: Option<Regex>,
    genre: Option<Regex>,
    year: Option<Regex>,
    tag: Option<Regex>,
    script: Option<Regex>,
    line_break: Option<Regex>,
    block: Option<Regex>,
    blank_lines: Option<Regex>,
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("Invalid metadata pattern {:?}: {}", pattern, e);
            None
        }
    }
}

fn alternatives(labels: &[&str]) -> String {
    labels
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|")
}

/// `Label:` then the shortest run up to the next bold label, closing block
/// tag, or end of input
fn field_pattern(labels: &[&str]) -> Option<Regex> {
    compile(&format!(
        r"(?is)(?:{}):\s*(.*?)(?:\s*<b|</p|</li|</div|\z)",
        alternatives(labels)
    ))
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        developer: field_pattern(DEVELOPER),
        release_date: field_pattern(RELEASE_DATE),
        language: field_pattern(LANGUAGE),
        players: field_pattern(PLAYERS),
        details: field_pattern(DETAILS),
        genre: compile(&format!(r"(?i)(?:{}):\s*([^;]*)", alternatives(GENRE))),
        year: compile(r"[0-9]{4}"),
        tag: compile(r"<[^>]*>"),
        script: compile(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>"),
        line_break: compile(r"(?i)<br\s*/?>"),
        block: compile(r"(?i)</?(?:p|div|li|ul|ol|tr|table|h[1-6])\b[^>]*>"),
        blank_lines: compile(r"\n{3,}"),
    })
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn strip_tags(text: &str) -> String {
    match &patterns().tag {
        Some(tag) => tag.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Raw value of a labelled field, tags removed; `None` if absent or blank
fn field_value(pattern: &Option<Regex>, html: &str) -> Option<String> {
    let caps = pattern.as_ref()?.captures(html)?;
    let raw = caps.get(1)?.as_str();
    let value = decode_entities(&strip_tags(raw)).trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN.to_string())
}

/// Build the five-line summary of a game page
///
/// Never fails: every field that can't be found reads `???`.
pub fn extract_short_info(html: &str) -> String {
    let p = patterns();

    let developer = or_unknown(field_value(&p.developer, html));
    let year = or_unknown(field_value(&p.release_date, html).and_then(|date| {
        p.year
            .as_ref()
            .and_then(|re| re.find(&date))
            .map(|m| m.as_str().to_string())
    }));
    let language = or_unknown(field_value(&p.language, html));
    let players = or_unknown(field_value(&p.players, html));
    let genre = or_unknown(field_value(&p.details, html).and_then(|details| {
        let caps = p.genre.as_ref()?.captures(&details)?;
        let genre = caps.get(1)?.as_str().trim().to_string();
        (!genre.is_empty()).then_some(genre)
    }));

    [
        format!("Developer: {}", developer),
        format!("Year: {}", year),
        format!("Language: {}", language),
        format!("Players: {}", players),
        format!("Genre: {}", genre),
    ]
    .join("\n")
}

/// Convert a description page to readable plain text
pub fn html_to_text(html: &str) -> String {
    let p = patterns();
    let mut text = html.replace("\r\n", "\n");

    if let Some(re) = &p.script {
        text = re.replace_all(&text, "").into_owned();
    }
    // Source line breaks carry no meaning in HTML.
    text = text.replace('\n', " ");
    if let Some(re) = &p.line_break {
        text = re.replace_all(&text, "\n").into_owned();
    }
    if let Some(re) = &p.block {
        text = re.replace_all(&text, "\n").into_owned();
    }
    text = decode_entities(&strip_tags(&text));

    let mut text = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n");
    if let Some(re) = &p.blank_lines {
        text = re.replace_all(&text, "\n\n").into_owned();
    }
    text.trim().to_string()
}

fn read_index(game_folder: &Path) -> Option<String> {
    let path = game_folder.join(INDEX_FILE);
    if !path.is_file() {
        return None;
    }
    match fs::read(&path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            log::warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

/// Short summary of a game folder, or the "unavailable" placeholder
pub fn load_summary(game_folder: &Path) -> String {
    match read_index(game_folder) {
        Some(html) => extract_short_info(&html),
        None => SUMMARY_UNAVAILABLE.to_string(),
    }
}

/// Full description page of a game folder, or a fallback page
pub fn load_full_description(game_folder: &Path) -> String {
    read_index(game_folder).unwrap_or_else(|| DESCRIPTION_UNAVAILABLE_HTML.to_string())
}
