//! Line-based parser for the sample-category configuration.
//!
//! ```text
//! # comment
//! [TTbar]
//! type: Background
//! type: Limits
//! title: t#bar{t}
//! file: tt_inclusive 1.0
//! datacard: TT
//! ```
//!
//! A `[name]` header opens a block, `key: value` lines fill it and a blank line
//! closes it. Only lines whose first non-blank character is `#` are comments,
//! since titles routinely contain `#` (ROOT LaTeX).

use hh_core::{Error, Result};

/// One `key: value` line inside a block.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Attr {
    pub key: String,
    pub value: String,
    pub line: usize,
}

/// A `[name]` block with its attribute lines, in file order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawBlock {
    pub name: String,
    pub line: usize,
    pub attrs: Vec<Attr>,
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn parse_header(line: &str) -> Option<&str> {
    line.strip_prefix('[').and_then(|s| s.strip_suffix(']')).map(str::trim)
}

fn split_kv(line: &str) -> Option<(String, String)> {
    let idx = line.find(':')?;
    let key = line[..idx].trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), line[idx + 1..].trim().to_string()))
}

/// Split the text into raw blocks. Fails on lines outside any block and on
/// lines that are neither a header nor `key: value`.
pub(crate) fn parse_blocks(text: &str) -> Result<Vec<RawBlock>> {
    let mut blocks: Vec<RawBlock> = Vec::new();
    let mut current: Option<RawBlock> = None;

    for (i, raw_line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw_line.trim();

        if line.is_empty() {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        if is_comment(line) {
            continue;
        }

        if let Some(name) = parse_header(line) {
            if name.is_empty() {
                return Err(Error::config(line_no, "category header without a name"));
            }
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            current = Some(RawBlock { name: name.to_string(), line: line_no, attrs: Vec::new() });
            continue;
        }

        let Some(block) = current.as_mut() else {
            return Err(Error::config(line_no, format!("line outside a category block: {line:?}")));
        };
        let Some((key, value)) = split_kv(line) else {
            return Err(Error::config(line_no, format!("expected 'key: value', got {line:?}")));
        };
        block.attrs.push(Attr { key, value, line: line_no });
    }

    if let Some(block) = current.take() {
        blocks.push(block);
    }
    Ok(blocks)
}

pub(crate) fn parse_bool(value: &str, line: usize) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(Error::config(line, format!("invalid boolean: {value:?}"))),
    }
}

pub(crate) fn parse_f64(value: &str, line: usize) -> Result<f64> {
    let v = value
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::config(line, format!("invalid number: {value:?}")))?;
    if !v.is_finite() {
        return Err(Error::config(line, format!("non-finite number: {value:?}")));
    }
    Ok(v)
}

/// `<id> [<scale factor>]`; the scale factor defaults to 1.
pub(crate) fn parse_source(value: &str, line: usize) -> Result<(String, f64)> {
    let mut parts = value.split_whitespace();
    let Some(id) = parts.next() else {
        return Err(Error::config(line, "file entry without a source id"));
    };
    let sf = match parts.next() {
        Some(s) => parse_f64(s, line)?,
        None => 1.0,
    };
    if let Some(extra) = parts.next() {
        return Err(Error::config(line, format!("unexpected token after scale factor: {extra:?}")));
    }
    Ok((id.to_string(), sf))
}

/// `<jet count> <scale factor>`.
pub(crate) fn parse_exclusive_sf(value: &str, line: usize) -> Result<(usize, f64)> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let [n_jets, sf] = parts.as_slice() else {
        return Err(Error::config(line, format!("expected '<jets> <sf>', got {value:?}")));
    };
    let n_jets = n_jets
        .parse::<usize>()
        .map_err(|_| Error::config(line, format!("invalid jet count: {n_jets:?}")))?;
    Ok((n_jets, parse_f64(sf, line)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_split_on_blank_lines() {
        let text = "# header comment\n[A]\ntype: Data\n\n[B]\ntitle: Z#rightarrow#tau#tau\n";
        let blocks = parse_blocks(text).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "A");
        assert_eq!(blocks[0].line, 2);
        assert_eq!(blocks[1].attrs[0].value, "Z#rightarrow#tau#tau");
    }

    #[test]
    fn header_closes_previous_block() {
        let blocks = parse_blocks("[A]\ntype: Data\n[B]\ntype: Signal").unwrap();
        assert_eq!(blocks.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(), ["A", "B"]);
    }

    #[test]
    fn line_outside_block_fails() {
        let err = parse_blocks("type: Data\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn missing_separator_fails() {
        let err = parse_blocks("[A]\ntype Data\n").unwrap_err();
        assert!(err.to_string().contains("expected 'key: value'"));
    }

    #[test]
    fn value_parsers() {
        assert_eq!(parse_source("dy_1jet 0.5", 3).unwrap(), ("dy_1jet".to_string(), 0.5));
        assert_eq!(parse_source("ggH", 3).unwrap(), ("ggH".to_string(), 1.0));
        assert!(parse_source("a 1 2", 3).is_err());
        assert_eq!(parse_exclusive_sf("2 1.07", 4).unwrap(), (2, 1.07));
        assert!(parse_exclusive_sf("2", 4).is_err());
        assert!(parse_bool("yes", 1).unwrap());
        assert!(parse_bool("maybe", 1).is_err());
        assert!(parse_f64("nan", 1).is_err());
    }
}
