use crate::extraction::PageContent;
use crate::model::{Cell, RawRow};

/// Tables need at least this many consecutive non-blank lines.
pub const MIN_TABLE_LINES: usize = 2;

/// A table reconstructed from pdftotext -layout output.
///
/// pdftotext -layout preserves column alignment using spaces, so a block of
/// consecutive non-blank lines where at least one line splits into two or
/// more segments is treated as a table, one row per line.
#[derive(Debug, Clone)]
pub struct ExtractedTable {
    pub page_number: usize,
    pub rows: Vec<RawRow>,
}

/// Find the tables within page content, in page and line order.
pub fn find_tables(pages: &[PageContent]) -> Vec<ExtractedTable> {
    let mut tables = Vec::new();

    for page in pages {
        let mut block: Vec<RawRow> = Vec::new();

        for line in &page.lines {
            if line.trim().is_empty() {
                flush_block(page.page_number, &mut block, &mut tables);
                continue;
            }
            block.push(line_to_row(line));
        }

        // Reached end of page while in a block
        flush_block(page.page_number, &mut block, &mut tables);
    }

    tables
}

fn flush_block(page_number: usize, block: &mut Vec<RawRow>, tables: &mut Vec<ExtractedTable>) {
    let rows = std::mem::take(block);
    let is_tabular = rows.iter().any(|r| r.cells().len() >= 2);
    if rows.len() >= MIN_TABLE_LINES && is_tabular {
        tables.push(ExtractedTable { page_number, rows });
    }
}

/// Turn one layout text line into a row of text cells.
pub fn line_to_row(line: &str) -> RawRow {
    RawRow::new(
        split_by_whitespace_gaps(line)
            .into_iter()
            .map(|s| Cell::text(s.trim()))
            .collect(),
    )
}

/// Split a line by gaps of 2+ whitespace characters.
pub fn split_by_whitespace_gaps(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = None;
    let mut space_count = 0;
    let mut first_space = 0;

    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            if space_count == 0 {
                first_space = i;
            }
            space_count += 1;
            if space_count == 2 {
                if let Some(s) = start {
                    segments.push(&line[s..first_space]);
                    start = None;
                }
            }
        } else {
            if start.is_none() {
                start = Some(i);
            }
            space_count = 0;
        }
    }

    if let Some(s) = start {
        segments.push(line[s..].trim_end());
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_by_whitespace_gaps() {
        let segments = split_by_whitespace_gaps("  Consulta general     45.000     $ 12.000");
        assert_eq!(segments, vec!["Consulta general", "45.000", "$ 12.000"]);
    }

    #[test]
    fn test_split_keeps_single_spaced_line_whole() {
        let segments = split_by_whitespace_gaps("CC 12345678 ANA MARIA RUIZ ");
        assert_eq!(segments, vec!["CC 12345678 ANA MARIA RUIZ"]);
    }

    #[test]
    fn test_split_handles_multibyte_before_gap() {
        let segments = split_by_whitespace_gaps("Extracción  Ñandú");
        assert_eq!(segments, vec!["Extracción", "Ñandú"]);
    }

    #[test]
    fn test_find_tables() {
        let pages = vec![PageContent {
            page_number: 1,
            lines: vec![
                "Clinica Dental".into(),
                "".into(),
                "CC 12345678 ANA RUIZ".into(),
                "  Consulta      1     $ 45.000".into(),
                "  Resina        2     $ 90.000".into(),
                "".into(),
                "Texto libre sin columnas".into(),
                "que sigue aqui".into(),
            ],
        }];

        let tables = find_tables(&pages);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].rows[0].cells().len(), 1);
        assert_eq!(tables[0].rows[1].cell(2), &Cell::text("$ 45.000"));
    }

    #[test]
    fn test_single_line_block_is_not_a_table() {
        let pages = vec![PageContent {
            page_number: 2,
            lines: vec!["Total     135.000".into()],
        }];
        assert!(find_tables(&pages).is_empty());
    }
}
