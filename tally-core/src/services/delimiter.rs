//! Delimiter detection

use csv::ReaderBuilder;

use crate::domain::{Delimiter, FileFailure};

/// Number of non-blank lines inspected
const SAMPLE_LINES: usize = 20;

/// Candidate ranking. Field order matters: consistency beats width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Score {
    consistent: bool,
    columns: usize,
}

/// Choose the field delimiter for a whole file.
///
/// Each candidate splits the sampled lines. Consistent column counts score
/// first, then the widest split; ties keep the earlier candidate in
/// `Delimiter::CANDIDATES`. A candidate that never yields a second column is
/// not considered.
pub fn detect_delimiter(text: &str) -> Result<Delimiter, FileFailure> {
    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();

    if sample.is_empty() {
        return Err(FileFailure::UnparsableFile {
            reason: "file is empty".to_string(),
        });
    }

    let mut best: Option<(Delimiter, Score)> = None;

    for delimiter in Delimiter::CANDIDATES {
        let counts = column_counts(&sample, delimiter);
        let widest = counts.iter().copied().max().unwrap_or(0);
        if widest <= 1 {
            continue;
        }

        let score = Score {
            consistent: counts.iter().all(|&c| c == counts[0]),
            columns: widest,
        };

        match best {
            Some((_, current)) if current >= score => {}
            _ => best = Some((delimiter, score)),
        }
    }

    best.map(|(delimiter, _)| delimiter)
        .ok_or_else(|| FileFailure::UnparsableFile {
            reason: "no delimiter splits any line into more than one column".to_string(),
        })
}

/// Column count per line, honouring quoted fields
fn column_counts(lines: &[&str], delimiter: Delimiter) -> Vec<usize> {
    lines
        .iter()
        .map(|line| {
            let mut reader = ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .delimiter(delimiter.as_byte())
                .from_reader(line.as_bytes());
            reader
                .records()
                .next()
                .and_then(|r| r.ok())
                .map(|r| r.len())
                .unwrap_or(1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semicolon_export_with_decimal_commas() {
        let text = "Data;SKU;Qtde;Preço;Custo\n01/03/2024;ABC1;10;50,00;30,00\n";
        assert_eq!(detect_delimiter(text).unwrap(), Delimiter::Semicolon);
    }

    #[test]
    fn test_simple_delimiters() {
        assert_eq!(detect_delimiter("a,b,c\nd,e,f").unwrap(), Delimiter::Comma);
        assert_eq!(detect_delimiter("a;b;c\nd;e;f").unwrap(), Delimiter::Semicolon);
        assert_eq!(detect_delimiter("a\tb\tc\nd\te\tf").unwrap(), Delimiter::Tab);
        assert_eq!(detect_delimiter("a|b|c\nd|e|f").unwrap(), Delimiter::Pipe);
    }

    #[test]
    fn test_quoted_commas_do_not_count() {
        let text = "sku,name,price\nA1,\"Shirt, blue\",10.00\nA2,\"Hat\",5.00\n";
        assert_eq!(detect_delimiter(text).unwrap(), Delimiter::Comma);
    }

    #[test]
    fn test_tie_prefers_comma() {
        // Both split every line into two columns
        let text = "a,b;c\nd,e;f\n";
        assert_eq!(detect_delimiter(text).unwrap(), Delimiter::Comma);
    }

    #[test]
    fn test_consistency_beats_width() {
        // Commas split unevenly, tabs split every line in three
        let text = "a\tb,x,y,z\tc\nd\te\tf\ng\th\ti\n";
        assert_eq!(detect_delimiter(text).unwrap(), Delimiter::Tab);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let text = "\n\na;b\n\nc;d\n";
        assert_eq!(detect_delimiter(text).unwrap(), Delimiter::Semicolon);
    }

    #[test]
    fn test_single_column_file_is_unparsable() {
        let err = detect_delimiter("just\nsome\nwords\n").unwrap_err();
        assert!(matches!(err, FileFailure::UnparsableFile { .. }));
    }

    #[test]
    fn test_empty_file_is_unparsable() {
        assert!(detect_delimiter("  \n\n").is_err());
    }
}
