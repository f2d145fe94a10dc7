//! Plain-text table rendering for `--format table`.
//!
//! Cells are clipped and padded before any color escape is wrapped around
//! them, so all width math runs on raw text and nothing ever needs to strip
//! escapes back out.

/// Columns never shrink below this, even under a tight width limit.
const MIN_COLUMN: usize = 4;

#[derive(Clone, Copy, Debug)]
pub struct TableOptions {
    /// Total line width to stay within, usually taken from `COLUMNS`.
    pub width_limit: Option<usize>,
    pub color: bool,
}

/// Render headers and string rows as an aligned two-space-separated table.
///
/// Missing cells render as `-`. When a width limit applies, every column is
/// clamped to an even share of the budget rather than grown greedily.
#[must_use]
pub fn render_rows(headers: &[&str], rows: &[Vec<String>], options: TableOptions) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len().max(MIN_COLUMN)).collect();
    for row in rows {
        for (cell, width) in row.iter().zip(widths.iter_mut()) {
            *width = (*width).max(cell.chars().count());
        }
    }
    if let Some(limit) = options.width_limit {
        clamp_widths(&mut widths, limit);
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| pad(&clip(header, *width), *width))
        .collect::<Vec<_>>()
        .join("  ");

    let mut lines = Vec::with_capacity(2 + rows.len());
    lines.push(header_line.clone());
    lines.push("-".repeat(header_line.chars().count()));
    for row in rows {
        let cells = widths
            .iter()
            .enumerate()
            .map(|(index, width)| {
                let raw = row.get(index).map_or("-", String::as_str);
                let padded = pad(&clip(raw, *width), *width);
                if options.color {
                    paint(&padded, raw)
                } else {
                    padded
                }
            })
            .collect::<Vec<_>>();
        lines.push(cells.join("  "));
    }
    lines.join("\n")
}

/// Clamp every column to an even share of the limit, in one pass. Columns
/// already narrower than their share keep their width; the wide ones (schema
/// text, failure detail) absorb the cut.
fn clamp_widths(widths: &mut [usize], limit: usize) {
    if widths.is_empty() {
        return;
    }
    let separators = (widths.len() - 1) * 2;
    let budget = limit.saturating_sub(separators);
    if widths.iter().sum::<usize>() <= budget {
        return;
    }
    let share = (budget / widths.len()).max(MIN_COLUMN);
    for width in widths.iter_mut() {
        *width = (*width).min(share);
    }
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.chars().count());
    format!("{text}{}", " ".repeat(fill))
}

/// Wrap the already-padded cell in a color escape when the raw value is an
/// outcome or risk word worth highlighting.
fn paint(padded: &str, raw: &str) -> String {
    let code = match raw.trim() {
        "applied" | "safe" => "32",
        "skipped" | "compatibility_risk" => "33",
        "failed" | "conflict" | "cancelled" => "31",
        _ => return padded.to_string(),
    };
    format!("\u{1b}[{code}m{padded}\u{1b}[0m")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain() -> TableOptions {
        TableOptions {
            width_limit: None,
            color: false,
        }
    }

    #[test]
    fn columns_align_to_the_widest_cell() {
        let rows = vec![
            vec!["user-value".to_string(), "applied".to_string()],
            vec!["order-events-value".to_string(), "skipped".to_string()],
        ];
        let out = render_rows(&["subject", "outcome"], &rows, plain());
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].chars().all(|c| c == '-'));
        // Both data rows line their outcome column up under the header.
        let col = lines[2].find("applied").unwrap();
        assert_eq!(lines[3].find("skipped").unwrap(), col);
        assert_eq!(lines[0].find("outcome").unwrap(), col);
    }

    #[test]
    fn long_cells_are_clipped_under_a_width_limit() {
        let schema = r#"{"type":"record","name":"User","fields":[{"name":"id","type":"long"}]}"#;
        let rows = vec![vec!["user-value".to_string(), schema.to_string()]];
        let out = render_rows(
            &["subject", "schema"],
            &rows,
            TableOptions {
                width_limit: Some(40),
                color: false,
            },
        );
        for line in out.lines() {
            assert!(line.chars().count() <= 40, "line too wide: {line:?}");
        }
        assert!(out.contains('…'));
    }

    #[test]
    fn short_rows_fill_missing_cells_with_a_dash() {
        let rows = vec![vec!["user-value".to_string()]];
        let out = render_rows(&["subject", "detail"], &rows, plain());
        assert!(out.lines().last().unwrap().contains('-'));
    }

    #[test]
    fn outcome_words_are_painted_after_padding() {
        let rows = vec![vec!["failed".to_string(), "user-value".to_string()]];
        let out = render_rows(
            &["outcome", "subject"],
            &rows,
            TableOptions {
                width_limit: None,
                color: true,
            },
        );
        let data = out.lines().last().unwrap();
        assert!(data.contains("\u{1b}[31mfailed "));
        assert!(data.ends_with("user-value"));
    }
}
