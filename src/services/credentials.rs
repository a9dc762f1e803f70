use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::repositories;

const USERNAME_BASE_MAX_LEN: usize = 12;
const USERNAME_BASE_MIN_LEN: usize = 3;
const DIGIT_PREFIX: char = 'u';
const SHORT_BASE_PAD: char = '0';
const USERNAME_FALLBACK: &str = "user";
const PASSWORD_SYMBOLS: &str = "!@#$%^&*()";
pub(crate) const EXPORT_HEADER: [&str; 4] =
    ["Full Name", "Email", "Username", "Temporary Password"];

/// Plain-text credential issued by an admin action, held until downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IssuedCredential {
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExportFormat {
    Csv,
    Txt,
}

impl ExportFormat {
    /// Unknown values fall back to CSV.
    pub(crate) fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "txt" => Self::Txt,
            _ => Self::Csv,
        }
    }

    pub(crate) fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Txt => "txt",
        }
    }

    pub(crate) fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Txt => "text/plain; charset=utf-8",
        }
    }
}

/// Lowercase ASCII alphanumerics of `base`, at most 12 chars, `user` when empty.
/// The result always passes the login username rule: a leading digit gets a `u`
/// prefix and bases shorter than 3 chars are padded with `0`.
pub(crate) fn normalize_username_base(base: &str) -> String {
    let mut normalized: String = base
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect();

    if normalized.is_empty() {
        return USERNAME_FALLBACK.to_string();
    }
    if normalized.starts_with(|ch: char| ch.is_ascii_digit()) {
        normalized.insert(0, DIGIT_PREFIX);
    }

    normalized.truncate(USERNAME_BASE_MAX_LEN);
    while normalized.len() < USERNAME_BASE_MIN_LEN {
        normalized.push(SHORT_BASE_PAD);
    }
    normalized
}

/// Seed for a generated username: first word of the name, else the entity label.
pub(crate) fn username_seed<'a>(full_name: &'a str, entity_label: &'a str) -> &'a str {
    full_name.split_whitespace().next().unwrap_or(entity_label)
}

fn username_candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{base}{attempt}")
    }
}

/// Probes `base`, `base2`, `base3`, ... from `attempt` until a case-insensitively
/// free name is found. Returns the name with the attempt that produced it.
pub(crate) async fn next_free_username(
    conn: &mut PgConnection,
    base: &str,
    mut attempt: u32,
) -> Result<(String, u32), sqlx::Error> {
    loop {
        let candidate = username_candidate(base, attempt);
        if !repositories::users::username_taken(&mut *conn, &candidate).await? {
            return Ok((candidate, attempt));
        }
        attempt += 1;
    }
}

pub(crate) fn generate_temp_password(length: usize) -> String {
    let alphabet: Vec<char> = ('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .chain(PASSWORD_SYMBOLS.chars())
        .collect();
    let mut rng = rand::thread_rng();
    let drawn: Vec<char> =
        (0..length).map(|_| alphabet[rng.gen_range(0..alphabet.len())]).collect();

    ensure_complexity(drawn)
}

const REQUIRED_CLASSES: [char; 3] = ['a', 'A', '1'];

fn char_class(ch: char) -> Option<usize> {
    if ch.is_ascii_lowercase() {
        Some(0)
    } else if ch.is_ascii_uppercase() {
        Some(1)
    } else if ch.is_ascii_digit() {
        Some(2)
    } else {
        None
    }
}

/// Patches in a lowercase, uppercase and digit when missing, never overwriting
/// the last member of a class that is already present.
fn ensure_complexity(mut chars: Vec<char>) -> String {
    for (class, replacement) in REQUIRED_CLASSES.iter().enumerate() {
        if chars.iter().any(|ch| char_class(*ch) == Some(class)) {
            continue;
        }

        let slot = (0..chars.len()).find(|&index| match char_class(chars[index]) {
            None => true,
            Some(existing) => {
                chars.iter().filter(|ch| char_class(**ch) == Some(existing)).count() > 1
            }
        });

        if let Some(index) = slot {
            chars[index] = *replacement;
        }
    }

    chars.into_iter().collect()
}

pub(crate) fn render_export(format: ExportFormat, credentials: &[IssuedCredential]) -> String {
    match format {
        ExportFormat::Csv => render_csv(credentials),
        ExportFormat::Txt => render_txt(credentials),
    }
}

fn render_csv(credentials: &[IssuedCredential]) -> String {
    let mut out = EXPORT_HEADER.join(",");
    out.push_str("\r\n");

    for item in credentials {
        let row = [&item.full_name, &item.email, &item.username, &item.password]
            .map(|field| csv_quote(field));
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }

    out
}

fn render_txt(credentials: &[IssuedCredential]) -> String {
    let mut out = EXPORT_HEADER.join(", ");
    out.push('\n');

    for item in credentials {
        out.push_str(&format!(
            "{}, {}, {}, {}\n",
            item.full_name, item.email, item.username, item.password
        ));
    }

    out
}

pub(crate) fn csv_quote(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
