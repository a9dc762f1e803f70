use thiserror::Error;

use crate::services::accounts::{non_blank, DEFAULT_FULL_NAME};

/// One data row of an uploaded roster; `line` is the 1-based line in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RosterRow {
    pub(crate) line: usize,
    pub(crate) full_name: String,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) class_id: Option<i64>,
    pub(crate) subject_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum RosterError {
    #[error("The CSV file is empty.")]
    Empty,
    #[error("The CSV file is not valid UTF-8.")]
    Encoding,
    #[error("CSV header must contain a full_name or name column.")]
    MissingNameColumn,
    #[error("The CSV file has more than {0} rows.")]
    TooManyRows(usize),
    #[error("Line {line}: {message}")]
    InvalidRow { line: usize, message: String },
}

#[derive(Debug, Default)]
struct HeaderMap {
    full_name: Option<usize>,
    name: Option<usize>,
    email: Option<usize>,
    phone: Option<usize>,
    gender: Option<usize>,
    class_id: Option<usize>,
    subject_id: Option<usize>,
}

impl HeaderMap {
    fn from_fields(fields: &[String]) -> Self {
        let mut map = Self::default();
        for (index, field) in fields.iter().enumerate() {
            let slot = match field.trim().to_ascii_lowercase().as_str() {
                "full_name" => &mut map.full_name,
                "name" => &mut map.name,
                "email" => &mut map.email,
                "phone" => &mut map.phone,
                "gender" => &mut map.gender,
                "class_id" => &mut map.class_id,
                "subject_id" => &mut map.subject_id,
                _ => continue,
            };
            slot.get_or_insert(index);
        }
        map
    }
}

pub(crate) fn parse_roster(bytes: &[u8], max_rows: usize) -> Result<Vec<RosterRow>, RosterError> {
    let text = std::str::from_utf8(bytes).map_err(|_| RosterError::Encoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = split_records(text).into_iter().filter(|(_, raw)| !raw.trim().is_empty());
    let (_, header_line) = records.next().ok_or(RosterError::Empty)?;
    let header = HeaderMap::from_fields(&parse_csv_record(&header_line));
    if header.full_name.is_none() && header.name.is_none() {
        return Err(RosterError::MissingNameColumn);
    }

    let mut rows = Vec::new();
    for (line, raw) in records {
        if rows.len() == max_rows {
            return Err(RosterError::TooManyRows(max_rows));
        }
        let fields = parse_csv_record(&raw);
        rows.push(parse_row(&header, line, &fields)?);
    }

    Ok(rows)
}

fn parse_row(header: &HeaderMap, line: usize, fields: &[String]) -> Result<RosterRow, RosterError> {
    let get = |index: Option<usize>| {
        non_blank(index.and_then(|i| fields.get(i)).map(String::as_str))
    };

    let full_name = get(header.full_name)
        .or_else(|| get(header.name))
        .unwrap_or_else(|| DEFAULT_FULL_NAME.to_string());

    Ok(RosterRow {
        line,
        full_name,
        email: get(header.email),
        phone: get(header.phone),
        gender: get(header.gender),
        class_id: parse_id(line, "class_id", get(header.class_id))?,
        subject_id: parse_id(line, "subject_id", get(header.subject_id))?,
    })
}

fn parse_id(line: usize, column: &str, value: Option<String>) -> Result<Option<i64>, RosterError> {
    let Some(value) = value else {
        return Ok(None);
    };

    value.parse::<i64>().map(Some).map_err(|_| RosterError::InvalidRow {
        line,
        message: format!("{column} must be a number, got '{value}'."),
    })
}

/// Splits on line breaks outside quotes, returning each record with the line it starts on.
fn split_records(text: &str) -> Vec<(usize, String)> {
    let mut records = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut start_line = 1usize;

    for ch in text.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                buf.push(ch);
            }
            '\n' => {
                line += 1;
                if in_quotes {
                    buf.push(ch);
                } else {
                    let record = std::mem::take(&mut buf);
                    records.push((start_line, record.trim_end_matches('\r').to_string()));
                    start_line = line;
                }
            }
            _ => buf.push(ch),
        }
    }

    if !buf.is_empty() {
        records.push((start_line, buf.trim_end_matches('\r').to_string()));
    }

    records
}

fn parse_csv_record(record: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = record.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut buf)),
            _ => buf.push(ch),
        }
    }
    out.push(buf);
    out
}
