//! XLSX output of an I/O listing.
//!
//! Every I/O slot gets one printable block: a header row identifying project, PLC, card,
//! drop and slot, a subtitle row with the revision date, the column titles, and one row
//! per terminal. A page break follows each block.

use std::path::Path;

use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use thiserror::Error;

use crate::listing::IoListing;
use crate::topology::{Slot, UNSET};

pub(crate) const SHEET_NAME: &str = "IO List";
pub(crate) const DEFAULT_OWNER: &str = "VALE";
/// slots 1 and 2 hold power supply and CPU / adapter; I/O cards start at slot 3
pub(crate) const DEFAULT_FIRST_IO_SLOT: u32 = 3;

// a block always shows at least this many terminals, so that all pages look the same
const MIN_CHANNEL_ROWS: usize = 32;
const BLOCK_HEADER_ROWS: u32 = 3;
const CHANNEL_ROW_HEIGHT: f64 = 14.5;
const COLUMN_WIDTHS: [f64; 7] = [10.0, 10.0, 30.0, 21.0, 21.0, 21.0, 21.0];
const PAPER_A4: u8 = 9;
const HEADER_FILL: u32 = 0xD9D9D9;

pub(crate) const HEADERS_CHANNELS: [&str; 4] =
    ["TERMINAL", "BIT", "Equipment TAG", "DESCRIPTION / COMMENT"];

#[derive(Debug, Error)]
pub(crate) enum ReportError {
    #[error("xlsx error: {0}")]
    Xlsx(#[from] XlsxError),
}

#[derive(Debug, Clone)]
pub(crate) struct ReportOptions {
    pub(crate) owner: String,
    pub(crate) first_io_slot: u32,
    pub(crate) revision: NaiveDate,
}

struct BlockFormats {
    header: Format,
    subtitle: Format,
    column_title: Format,
    centered: Format,
    comment: Format,
}

impl ReportOptions {
    pub(crate) fn new(revision: NaiveDate) -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            first_io_slot: DEFAULT_FIRST_IO_SLOT,
            revision,
        }
    }
}

impl BlockFormats {
    fn new() -> Self {
        let centered = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin);
        let header = centered.clone().set_bold().set_font_size(10);
        let column_title = header.clone().set_background_color(Color::RGB(HEADER_FILL));
        let comment = Format::new()
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_indent(1)
            .set_border(FormatBorder::Thin);

        Self {
            header,
            subtitle: centered.clone(),
            column_title,
            centered,
            comment,
        }
    }
}

/// file name used when no output file is given, e.g. "REMOTE_IO_UC1000CC21_2025-12-31.xlsx"
pub(crate) fn default_output_name(title: &str, date: NaiveDate) -> String {
    format!(
        "REMOTE_IO_{}_{}.xlsx",
        title.to_uppercase(),
        date.format("%Y-%m-%d")
    )
}

/// Write the listing to an xlsx file. Returns the number of slot blocks in the worksheet.
pub(crate) fn write_report(
    listing: &IoListing,
    options: &ReportOptions,
    out_path: &Path,
) -> Result<usize, ReportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    setup_page(worksheet)?;

    let formats = BlockFormats::new();
    let revision = options.revision.format("%Y-%m-%d").to_string();
    let mut page_breaks = Vec::new();
    let mut row: u32 = 0;
    let mut blocks = 0;

    for rack in listing.topology.racks.values() {
        for slot in rack.slots.values() {
            if slot.index < options.first_io_slot {
                continue;
            }
            row = write_slot_block(
                worksheet,
                row,
                listing,
                options,
                rack.index,
                slot,
                &revision,
                &formats,
            )?;
            page_breaks.push(row);
            blocks += 1;
        }
    }

    if !page_breaks.is_empty() {
        worksheet.set_page_breaks(&page_breaks)?;
    }

    workbook.save(out_path)?;

    Ok(blocks)
}

// A4 landscape, one page wide
fn setup_page(worksheet: &mut Worksheet) -> Result<(), XlsxError> {
    worksheet
        .set_paper_size(PAPER_A4)
        .set_landscape()
        .set_print_fit_to_pages(1, 0)
        .set_margins(0.5, 0.5, 0.5, 0.5, 0.3, 0.3);
    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }
    Ok(())
}

// write one slot starting at first_row; returns the first row after the block
#[allow(clippy::too_many_arguments)]
fn write_slot_block(
    worksheet: &mut Worksheet,
    first_row: u32,
    listing: &IoListing,
    options: &ReportOptions,
    rack_index: u32,
    slot: &Slot,
    revision: &str,
    formats: &BlockFormats,
) -> Result<u32, XlsxError> {
    // header: owner | title | PLC model | card | drop | slot
    let row = first_row;
    worksheet.merge_range(row, 0, row, 1, &options.owner, &formats.header)?;
    worksheet.write_string_with_format(row, 2, &listing.title, &formats.header)?;
    worksheet.write_string_with_format(
        row,
        3,
        format!("Model\n{}", listing.plc_model),
        &formats.header,
    )?;
    worksheet.write_string_with_format(row, 4, format!("Card\n{}", slot.model), &formats.header)?;
    worksheet.write_string_with_format(row, 5, format!("Drop\n{rack_index:02}"), &formats.header)?;
    worksheet.write_string_with_format(row, 6, format!("Slot\n{:02}", slot.index), &formats.header)?;

    // subtitle and revision
    let row = first_row + 1;
    worksheet.merge_range(
        row,
        0,
        row,
        4,
        "Digital or Analog Inputs/Outputs",
        &formats.subtitle,
    )?;
    worksheet.merge_range(row, 5, row, 6, &format!("Revision: {revision}"), &formats.subtitle)?;

    // column titles; the description spans the remaining four columns
    let row = first_row + 2;
    for (col, title) in HEADERS_CHANNELS[..3].iter().enumerate() {
        worksheet.write_string_with_format(row, col as u16, *title, &formats.column_title)?;
    }
    worksheet.merge_range(row, 3, row, 6, HEADERS_CHANNELS[3], &formats.column_title)?;

    let channel_rows = slot.channels.len().max(MIN_CHANNEL_ROWS);
    for pos in 0..channel_rows {
        let row = first_row + BLOCK_HEADER_ROWS + pos as u32;
        let (terminal, tag, comment) = terminal_row(slot, pos);

        worksheet.set_row_height(row, CHANNEL_ROW_HEIGHT)?;
        worksheet.write_number_with_format(row, 0, terminal as f64, &formats.centered)?;
        worksheet.write_number_with_format(row, 1, pos as f64, &formats.centered)?;
        worksheet.write_string_with_format(row, 2, tag, &formats.centered)?;
        worksheet.merge_range(row, 3, row, 6, comment, &formats.comment)?;
    }

    Ok(first_row + BLOCK_HEADER_ROWS + channel_rows as u32)
}

// terminal number, tag and comment of the row at pos; rows past the last channel are filler
fn terminal_row(slot: &Slot, pos: usize) -> (usize, &str, &str) {
    match slot.channels.get(pos) {
        Some(channel) => (
            channel.index,
            display_value(&channel.name),
            display_value(&channel.comment),
        ),
        None => (pos + 1, UNSET, UNSET),
    }
}

// empty names and comments are shown as "-"
fn display_value(value: &str) -> &str {
    if value.is_empty() { UNSET } else { value }
}
