//! CSV to JSON rows with encoding and delimiter auto-detection.
//!
//! Each data line becomes a JSON object keyed by the header line.
//! Every value is a string; empty cells are empty strings.

use serde_json::{Map, Value};

use crate::error::{CsvError, CsvResult};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records as JSON objects
    pub records: Vec<Value>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
/// Unknown encodings and invalid UTF-8 are decoded lossily.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        // Latin-1 labels map to windows-1252, a superset on the printable range
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;
    for sep in [';', ',', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }
    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Quoted fields are honoured, short rows are padded with empty strings,
/// cells beyond the header width are dropped and blank lines are skipped.
///
/// # Example
/// ```
/// use excel_view::parser::parse_csv;
///
/// let result = parse_csv("name;age\nAlice;30\nBob;25", ';').unwrap();
///
/// assert_eq!(result.headers, vec!["name", "age"]);
/// assert_eq!(result.records[0]["name"], "Alice");
/// assert_eq!(result.records[1]["age"], "25");
/// ```
pub fn parse_csv(content: &str, delimiter: char) -> CsvResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(CsvError::Empty);
    }
    if !delimiter.is_ascii() {
        return Err(CsvError::Parse {
            line: 0,
            message: format!("delimiter '{}' is not ASCII", delimiter),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_error)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(parse_error)?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let obj: Map<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = record.get(i).unwrap_or("");
                (header.clone(), Value::String(cell.to_string()))
            })
            .collect();
        records.push(Value::Object(obj));
    }

    Ok(ParseResult {
        records,
        encoding: "utf-8".to_string(),
        delimiter,
        headers,
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let mut result = parse_csv(&content, delimiter)?;
    result.encoding = encoding;
    Ok(result)
}

fn parse_error(err: csv::Error) -> CsvError {
    CsvError::Parse {
        line: err.position().map(|p| p.line()).unwrap_or(0),
        message: err.to_string(),
    }
}
