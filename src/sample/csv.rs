use std::fs::File;
use std::io::Read;
use std::path::Path;
use log::debug;
use crate::error::{ModelError, Result};
use super::{Sample, Column};

pub fn parse_header<R>(csv_reader : &mut ::csv::Reader<R>) -> Result<Vec<String>>
where
    R : Read
{
    let header = csv_reader.headers()?;
    Ok(header.iter().map(|e| e.trim().to_string() ).collect())
}

/// CSV files might have unnamed columns. In this case,
/// attribute arbitrary names "(Column {i})" to the columns, and return them as
/// the first tuple element. The first line is then actual data, returned in
/// the second tuple element. If the first line has valid names, return None.
/// The csv crate considers the first row as a header by default, so we should
/// check that we don't have a "pure" data file.
pub fn try_convert_header_to_data(header : &[String]) -> Option<(Vec<String>, Vec<String>)> {
    let mut new_header = Vec::new();
    let mut first_line = Vec::new();
    for (i, e) in header.iter().enumerate() {
        if e.parse::<f64>().is_ok() {
            new_header.push(format!("(Column {})", i));
            first_line.push(e.clone());
        }
    }
    if !header.is_empty() && new_header.len() == header.len() {
        Some((new_header, first_line))
    } else {
        None
    }
}

/// Given a textual content as CSV, return its columns as strings, in file order.
pub fn parse_csv_as_text_cols<R>(reader : R) -> Result<Vec<(String, Vec<String>)>>
where
    R : Read
{
    let mut csv_reader = ::csv::Reader::from_reader(reader);
    let header = parse_header(&mut csv_reader)?;
    let maybe_header_data = try_convert_header_to_data(&header[..]);
    let data_keys = match &maybe_header_data {
        Some((header, _)) => header.clone(),
        None => header.clone()
    };
    let mut data_vec : Vec<(String, Vec<String>)> = data_keys.iter()
        .map(|d| (d.clone(), Vec::new()) )
        .collect();
    if let Some((_, first_data_row)) = &maybe_header_data {
        for (i, (_, v)) in data_vec.iter_mut().enumerate() {
            v.push(first_data_row[i].clone());
        }
    }
    for row_record in csv_reader.records() {
        let row = row_record?;
        for (i, entry) in row.iter().enumerate() {
            if let Some((_, v)) = data_vec.get_mut(i) {
                v.push(entry.trim().to_string());
            }
        }
    }
    if data_vec.iter().all(|(_, v)| v.is_empty() ) {
        return Err(ModelError::EmptySample);
    }
    Ok(data_vec)
}

/// Reads a sample from CSV content. Columns where every entry parses as a number
/// become numeric; all others are kept as text (categorical).
pub fn load<R>(reader : R) -> Result<Sample>
where
    R : Read
{
    let cols = parse_csv_as_text_cols(reader)?;
    let columns : Vec<Column> = cols.into_iter()
        .map(|(name, v)| Column::from_vec_try_num(name, v) )
        .collect();
    let sample = Sample::new(columns)?;
    debug!("Loaded CSV sample with {} rows over {:?}", sample.nrows(), sample.names());
    Ok(sample)
}

pub fn load_from_path<P>(path : P) -> Result<Sample>
where
    P : AsRef<Path>
{
    let f = File::open(path)?;
    load(f)
}
