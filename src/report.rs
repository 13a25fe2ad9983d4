//! The spreadsheet written at the end of a run.

use std::{collections::BTreeMap, path::Path};

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};

use crate::item::{Item, StockQuantity};
use crate::Result;

pub const HEADERS: [&str; 9] = [
    "Code",
    "Type",
    "Package",
    "In Stock",
    "Description",
    "Link",
    "Datasheet",
    "_detail_error",
    "CategoryPath",
];

const COLUMN_WIDTHS: [f64; 9] = [10.0, 35.0, 16.0, 14.0, 90.0, 8.0, 10.0, 22.0, 60.0];

/// Display text of every hyperlink cell.
pub const LINK_LABEL: &str = "Link";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell<'a> {
    Empty,
    Text(&'a str),
    Number(u64),
    Link(&'a str),
}

impl<'a> Cell<'a> {
    fn text(value: &'a str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    fn link(url: &'a str) -> Self {
        if url.is_empty() {
            Cell::Empty
        } else {
            Cell::Link(url)
        }
    }
}

pub type Row<'a> = [Cell<'a>; 9];

/// Order items by key, keeping the last item of any repeated key.
pub fn sorted(items: Vec<Item>) -> Vec<Item> {
    items
        .into_iter()
        .map(|item| (item.key.clone(), item))
        .collect::<BTreeMap<_, _>>()
        .into_values()
        .collect()
}

/// Cells for each item, in [`HEADERS`] order.
pub fn rows(items: &[Item]) -> Vec<Row<'_>> {
    items.iter().map(row).collect()
}

fn row(item: &Item) -> Row<'_> {
    let stock = match &item.stock {
        Some(StockQuantity::Count(count)) => Cell::Number(*count),
        Some(StockQuantity::Raw(raw)) => Cell::text(raw),
        None => Cell::Empty,
    };
    [
        Cell::text(&item.key),
        Cell::text(&item.kind),
        Cell::text(&item.package),
        stock,
        Cell::text(&item.description),
        Cell::link(&item.source_url),
        Cell::link(item.datasheet_url.as_deref().unwrap_or_default()),
        Cell::text(item.error_note.as_deref().unwrap_or_default()),
        Cell::text(&item.category_path),
    ]
}

/// `{base}_{YYYY-MM-DD}.xlsx`
pub fn file_name(base: &str, date: NaiveDate) -> String {
    format!("{}_{}.xlsx", base, date.format("%Y-%m-%d"))
}

pub trait ReportWriter {
    fn write(&self, items: &[Item], path: &Path) -> Result<()>;
}

/// Single-sheet XLSX with a frozen header row.
#[derive(Debug, Clone)]
pub struct XlsxReport {
    sheet_name: String,
}

impl Default for XlsxReport {
    fn default() -> Self {
        Self::new("BasicParts")
    }
}

impl XlsxReport {
    pub fn new<S: Into<String>>(sheet_name: S) -> Self {
        Self {
            sheet_name: sheet_name.into(),
        }
    }
}

impl ReportWriter for XlsxReport {
    fn write(&self, items: &[Item], path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name)?;

        let bold = Format::new().set_bold();
        for (col, header) in (0u16..).zip(HEADERS) {
            sheet.write_string_with_format(0, col, header, &bold)?;
        }
        sheet.set_freeze_panes(1, 0)?;
        for (col, width) in (0u16..).zip(COLUMN_WIDTHS) {
            sheet.set_column_width(col, width)?;
        }

        for (row_idx, cells) in (1u32..).zip(rows(items)) {
            for (col, cell) in (0u16..).zip(cells) {
                match cell {
                    Cell::Empty => {}
                    Cell::Text(text) => {
                        sheet.write_string(row_idx, col, text)?;
                    }
                    Cell::Number(number) => {
                        sheet.write_number(row_idx, col, number as f64)?;
                    }
                    Cell::Link(url) => {
                        if let Err(err) = sheet.write_url_with_text(row_idx, col, url, LINK_LABEL) {
                            tracing::warn!(row = row_idx, col, "report: link kept as text: {}", err);
                            sheet.write_string(row_idx, col, url)?;
                        }
                    }
                }
            }
        }

        workbook.save(path)?;
        tracing::info!(path = %path.display(), rows = items.len(), "report: saved");
        Ok(())
    }
}
