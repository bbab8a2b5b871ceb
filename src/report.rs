// src/report.rs
use crate::error::CliError;
use crate::xss::types::ScanRecord;
use csv::Writer;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(CliError::Validation(format!(
                "Unsupported output format '{}' (expected json, yaml or csv)",
                other
            ))),
        }
    }
}

const CSV_HEADER: [&str; 9] = [
    "url",
    "endpoint_type",
    "endpoint_url",
    "endpoint_method",
    "endpoint_params",
    "payload",
    "success",
    "waf",
    "vuln_type",
];

pub fn render(records: &[ScanRecord], format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(records)?),
        OutputFormat::Csv => render_csv(records),
    }
}

/// One row per record; the params mapping becomes a JSON object string
fn render_csv(records: &[ScanRecord]) -> Result<String, CliError> {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for record in records {
        let params = serde_json::to_string(&record.endpoint_params)?;
        wtr.write_record([
            record.url.as_str(),
            record.endpoint_type.as_str(),
            record.endpoint_url.as_str(),
            record.endpoint_method.as_str(),
            params.as_str(),
            record.payload.as_str(),
            if record.success { "true" } else { "false" },
            record.waf.as_deref().unwrap_or(""),
            record.vuln_type.as_str(),
        ])?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| CliError::Serialize(format!("CSV: {}", e)))?;
    String::from_utf8(data).map_err(|e| CliError::Serialize(format!("CSV: {}", e)))
}

/// Write rendered results to `path`, or to stdout when no path is given
pub fn write_output(rendered: &str, path: Option<&Path>) -> Result<(), CliError> {
    match path {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("✓ Results saved to: {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
