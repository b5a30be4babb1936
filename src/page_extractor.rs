use itertools::Itertools;
use log::debug;

use crate::{
    column_map::ColumnMap,
    row_parser::{parse_row, RawRow},
    schema::Record,
};

/// Results on the visible page, in table order. Rows that are not results are left out.
pub fn extract_page(rows: &[RawRow], map: &ColumnMap) -> Vec<Record> {
    let records = rows.iter().filter_map(|row| parse_row(row, map)).collect_vec();
    debug!("{} of {} rows are results", records.len(), rows.len());
    records
}
