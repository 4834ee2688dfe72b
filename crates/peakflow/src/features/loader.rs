use super::RawTable;
use crate::Result;
use crate::error::TrainingDataError;
use anyhow::anyhow;
use csv::ReaderBuilder;
use logging::*;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecimalMark {
    Point,
    Comma,
}

/// CSV ファイルを読み込む。区切り文字と小数点は自動判定する
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read {}: {}", path.display(), e))?;
    parse_csv(&content)
}

/// まず `;` 区切り + 小数点カンマ (UCI 原本の形式) を試し、
/// 列が分割できなければ通常の `,` 区切りで読み直す
pub fn parse_csv(content: &str) -> Result<RawTable> {
    let log = DEFAULT.new(o!("function" => "loader::parse_csv"));

    match parse_with(content, b';', DecimalMark::Comma) {
        Ok(table) if table.headers.len() > 1 => {
            info!(log, "parsed as semicolon separated";
                "columns" => table.headers.len(),
                "rows" => table.rows.len(),
            );
            return Ok(table);
        }
        Ok(_) => debug!(log, "semicolon parse produced a single column, falling back"),
        Err(e) => debug!(log, "semicolon parse failed, falling back"; "error" => %e),
    }

    let table = parse_with(content, b',', DecimalMark::Point)?;
    info!(log, "parsed as comma separated";
        "columns" => table.headers.len(),
        "rows" => table.rows.len(),
    );
    Ok(table)
}

fn parse_with(content: &str, delimiter: u8, decimal: DecimalMark) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| anyhow!(TrainingDataError::Parse(e.to_string())))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    // 全セルが空の列 (行末の区切り文字で生じる) を後で落とすため記録する
    let mut non_empty = vec![false; headers.len()];
    for record in reader.records() {
        let record = record.map_err(|e| anyhow!(TrainingDataError::Parse(e.to_string())))?;
        let row: Vec<Option<f64>> = (0..headers.len())
            .map(|i| {
                let field = record.get(i).unwrap_or("").trim();
                if !field.is_empty() {
                    non_empty[i] = true;
                }
                parse_cell(field, decimal)
            })
            .collect();
        rows.push(row);
    }

    Ok(drop_empty_columns(headers, rows, &non_empty))
}

fn parse_cell(field: &str, decimal: DecimalMark) -> Option<f64> {
    if field.is_empty() {
        return None;
    }
    let parsed = match decimal {
        DecimalMark::Point => field.parse::<f64>(),
        DecimalMark::Comma => field.replace(',', ".").parse::<f64>(),
    };
    parsed.ok().filter(|v| v.is_finite())
}

fn drop_empty_columns(
    headers: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
    non_empty: &[bool],
) -> RawTable {
    let keep: Vec<usize> = (0..headers.len()).filter(|i| non_empty[*i]).collect();
    if keep.len() == headers.len() {
        return RawTable::new(headers, rows);
    }
    let headers = keep.iter().map(|i| headers[*i].clone()).collect();
    let rows = rows
        .into_iter()
        .map(|row| keep.iter().map(|i| row[*i]).collect())
        .collect();
    RawTable::new(headers, rows)
}
