
pub mod loader;

use logging::*;

/// 欠測を表すセンチネル値 (UCI Air Quality データセットの慣例)
pub const MISSING_SENTINEL: f64 = -200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Co,
    Nox,
    No2,
    Benzene,
    Temperature,
    Humidity,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Co => "CO",
            Column::Nox => "NOx",
            Column::No2 => "NO2",
            Column::Benzene => "C6H6",
            Column::Temperature => "T",
            Column::Humidity => "RH",
        }
    }

    pub fn is_pollutant(self) -> bool {
        !matches!(self, Column::Temperature | Column::Humidity)
    }
}

/// 正規列名・別名リスト・列が無いときの既定値の組
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub column: Column,
    pub aliases: &'static [&'static str],
    pub default: f64,
}

/// 列解決の表。別名は先頭から順に照合する
pub const COLUMN_SPECS: [ColumnSpec; 6] = [
    ColumnSpec {
        column: Column::Co,
        aliases: &["CO(GT)", "CO_GT", "CO"],
        default: 0.0,
    },
    ColumnSpec {
        column: Column::Nox,
        aliases: &["NOx(GT)", "NOX(GT)", "NOx_GT", "NOx"],
        default: 0.0,
    },
    ColumnSpec {
        column: Column::No2,
        aliases: &["NO2(GT)", "NO2_GT", "NO2"],
        default: 0.0,
    },
    ColumnSpec {
        column: Column::Benzene,
        aliases: &["C6H6(GT)", "C6H6_GT", "Benzene", "C6H6"],
        default: 0.0,
    },
    ColumnSpec {
        column: Column::Temperature,
        aliases: &["T", "Temp", "Temperature", "tempC"],
        default: 15.0,
    },
    ColumnSpec {
        column: Column::Humidity,
        aliases: &["RH", "Humidity", "RelativeHumidity", "humidity"],
        default: 55.0,
    },
];

/// 別名リストの中で最初にヘッダへ存在するものの列番号を返す
pub fn resolve_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}

/// 列の出所。既定値で埋めた列は監査のため測定値と区別する
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    Measured(String),
    Defaulted,
}

/// 読み込み直後の数値表。パースできなかったセルは None
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<f64>>>) -> Self {
        Self { headers, rows }
    }

    fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col).copied().flatten())
            .filter(|v| v.is_finite() && *v != MISSING_SENTINEL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub co: f64,
    pub nox: f64,
    pub no2: f64,
    pub benzene: f64,
    pub temp_c: f64,
    pub humidity: f64,
}

impl Observation {
    fn set(&mut self, column: Column, value: f64) {
        match column {
            Column::Co => self.co = value,
            Column::Nox => self.nox = value,
            Column::No2 => self.no2 = value,
            Column::Benzene => self.benzene = value,
            Column::Temperature => self.temp_c = value,
            Column::Humidity => self.humidity = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanTable {
    pub observations: Vec<Observation>,
    pub sources: Vec<(Column, ColumnSource)>,
    pub dropped_rows: usize,
    pub imputed_cells: usize,
}

impl CleanTable {
    pub fn source(&self, column: Column) -> Option<&ColumnSource> {
        self.sources
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, s)| s)
    }
}

/// 生の表を 6 列の正規形に整える。
///
/// - 見つからない列は既定値で合成する (失敗にはしない)
/// - 気温・湿度が欠測の行は落とす
/// - 汚染物質の欠測セルは既定値で埋める
pub fn prepare(raw: &RawTable) -> CleanTable {
    let log = DEFAULT.new(o!(
        "function" => "features::prepare",
        "raw_rows" => raw.rows.len(),
    ));

    let resolved: Vec<(ColumnSpec, Option<usize>)> = COLUMN_SPECS
        .iter()
        .map(|spec| (*spec, resolve_column(&raw.headers, spec.aliases)))
        .collect();

    let sources: Vec<(Column, ColumnSource)> = resolved
        .iter()
        .map(|(spec, index)| match index {
            Some(i) => {
                let header = raw.headers[*i].clone();
                debug!(log, "column resolved";
                    "column" => spec.column.name(),
                    "header" => &header,
                );
                (spec.column, ColumnSource::Measured(header))
            }
            None => {
                warn!(log, "column not found, filling with default";
                    "column" => spec.column.name(),
                    "default" => spec.default,
                    "source" => "defaulted",
                );
                (spec.column, ColumnSource::Defaulted)
            }
        })
        .collect();

    let mut observations = Vec::with_capacity(raw.rows.len());
    let mut dropped_rows = 0;
    let mut imputed_cells = 0;

    'rows: for row in 0..raw.rows.len() {
        let mut obs = Observation {
            co: 0.0,
            nox: 0.0,
            no2: 0.0,
            benzene: 0.0,
            temp_c: 0.0,
            humidity: 0.0,
        };
        for (spec, index) in &resolved {
            let value = match index {
                None => spec.default,
                Some(col) => match raw.cell(row, *col) {
                    Some(v) => v,
                    None if spec.column.is_pollutant() => {
                        imputed_cells += 1;
                        spec.default
                    }
                    None => {
                        dropped_rows += 1;
                        continue 'rows;
                    }
                },
            };
            obs.set(spec.column, value);
        }
        observations.push(obs);
    }

    info!(log, "prepared observations";
        "rows" => observations.len(),
        "dropped_rows" => dropped_rows,
        "imputed_cells" => imputed_cells,
    );

    CleanTable {
        observations,
        sources,
        dropped_rows,
        imputed_cells,
    }
}
