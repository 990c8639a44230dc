use std::fs::{self, File, OpenOptions};
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use crate::card::{OutputGroup, RenderedCard};
use crate::error::{Error, Result};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }
    Ok(())
}

fn open_for_rows(path: &Path, overwrite: bool) -> Result<File> {
    ensure_parent(path)?;
    let mut options = OpenOptions::new();
    options.create(true);
    if overwrite {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    options.open(path).map_err(|err| Error::io(path, err))
}

/// Appends semicolon separated rows, or replaces the file when `overwrite`.
pub fn write_delimited(path: &Path, cards: &[RenderedCard], overwrite: bool) -> Result<()> {
    let file = open_for_rows(path, overwrite)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::CRLF)
        .from_writer(file);

    for card in cards {
        writer.write_record(&card.columns)?;
    }
    writer.flush().map_err(|err| Error::io(path, err))?;
    Ok(())
}

/// Writes a header row plus one row per card. The file is always replaced.
pub fn write_workbook(path: &Path, cards: &[RenderedCard], headers: &[&str]) -> Result<()> {
    ensure_parent(path)?;
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let cell_format = Format::new().set_text_wrap();

    let worksheet = workbook.add_worksheet();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }
    for (row, card) in cards.iter().enumerate() {
        for (col, value) in card.columns.iter().enumerate() {
            worksheet.write_string_with_format(
                row as u32 + 1,
                col as u16,
                value.as_str(),
                &cell_format,
            )?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

pub fn write_group(
    group: &OutputGroup,
    cards: &[RenderedCard],
    headers: &[&str],
    overwrite: bool,
) -> Result<()> {
    tracing::info!(
        path = %group.path.display(),
        target = %group.target,
        cards = cards.len(),
        "Writing flashcards"
    );
    if group.target.is_workbook() {
        write_workbook(&group.path, cards, headers)
    } else {
        write_delimited(&group.path, cards, overwrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn card(word: &str, sentences: &str) -> RenderedCard {
        RenderedCard {
            columns: vec![
                word.to_string(),
                "table".to_string(),
                sentences.to_string(),
                "mnemonic".to_string(),
            ],
        }
    }

    #[test]
    fn delimited_rows_use_semicolons_crlf_and_quote_newlines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cards.csv");
        write_delimited(&path, &[card("mesa", "la mesa\nthe table")], false).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "mesa;table;\"la mesa\nthe table\";mnemonic\r\n");
    }

    #[test]
    fn delimited_appends_unless_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cards.csv");

        write_delimited(&path, &[card("mesa", "x")], false).unwrap();
        write_delimited(&path, &[card("silla", "y")], false).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);

        write_delimited(&path, &[card("casa", "z")], true).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "casa;table;z;mnemonic\r\n");
    }

    #[test]
    fn workbook_is_written_as_xlsx() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cards.xlsx");
        let headers = ["Word", "Translation", "Example Sentences", "Explanation"];
        write_workbook(&path, &[card("mesa", "\"la mesa\nthe table\"")], &headers).unwrap();

        let bytes = fs::read(&path).unwrap();
        // xlsx files are zip archives
        assert!(bytes.starts_with(b"PK"));
    }
}
