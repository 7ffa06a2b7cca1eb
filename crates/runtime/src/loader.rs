use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use tracing::info;

use sc_core::{CoreError, Record};
use sc_scenarios::RankedScenario;

use crate::{Result, RuntimeError};

/// Reads the product/customer CSV. Columns are matched by header name, extras such as
/// `ProductID` are ignored.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file =
        File::open(path).map_err(|source| RuntimeError::Io { path: path.to_path_buf(), source })?;
    let records = read_records_from(BufReader::new(file))?;
    info!(path = %path.display(), records = records.len(), "loaded dataset");
    Ok(records)
}

pub fn read_records_from<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<Record>().enumerate() {
        // header is line 1
        let record = row.map_err(|e| CoreError::Data(format!("line {}: {e}", i + 2)))?;
        records.push(record);
    }
    if records.is_empty() {
        return Err(CoreError::Data("dataset contains no records".into()).into());
    }
    Ok(records)
}

pub fn write_scenarios(path: &Path, scenarios: &[RankedScenario]) -> Result<()> {
    let file =
        File::create(path).map_err(|source| RuntimeError::Io { path: path.to_path_buf(), source })?;
    write_scenarios_to(file, scenarios)?;
    info!(path = %path.display(), rows = scenarios.len(), "exported scenarios");
    Ok(())
}

pub fn write_scenarios_to<W: Write>(writer: W, scenarios: &[RankedScenario]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for scenario in scenarios {
        writer.serialize(scenario)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
