use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use flate2::read::GzDecoder;
use serde_json::Value;

/// Default name of the CGM array inside a JSON container.
pub const DEFAULT_FIELD: &str = "numCGM";

/// Load the CGM sample series from `path`.
///
/// `.json` and `.json.gz` files hold either a bare array or an object with
/// the array under `field` (a single nested row `[[..]]` is unwrapped).
/// Anything else is read as text: numbers separated by commas or whitespace,
/// `#` starting a comment.
pub fn load_samples(path: &Path, field: &str) -> anyhow::Result<Vec<f64>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    let samples = if name.ends_with(".json.gz") {
        samples_from_json(BufReader::new(GzDecoder::new(file)), field)
    } else if name.ends_with(".json") {
        samples_from_json(BufReader::new(file), field)
    } else if name.ends_with(".gz") {
        samples_from_text(BufReader::new(GzDecoder::new(file)))
    } else {
        samples_from_text(BufReader::new(file))
    };

    samples.with_context(|| format!("reading samples from {}", path.display()))
}

pub fn samples_from_json<R: Read>(reader: R, field: &str) -> anyhow::Result<Vec<f64>> {
    let value: Value = serde_json::from_reader(reader)?;
    match value {
        Value::Object(mut map) => {
            let array = map
                .remove(field)
                .ok_or_else(|| anyhow!("no field '{}' in JSON object", field))?;
            samples_from_value(array)
        }
        other => samples_from_value(other),
    }
}

fn samples_from_value(value: Value) -> anyhow::Result<Vec<f64>> {
    let items = match value {
        Value::Array(items) => items,
        other => bail!("expected an array of samples, found {}", kind(&other)),
    };

    // MATLAB-style 1xN row
    if items.len() == 1 && items[0].is_array() {
        return samples_from_value(items.into_iter().next().unwrap_or(Value::Null));
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_f64()
                .ok_or_else(|| anyhow!("sample {} is {}, not a number", i, kind(item)))
        })
        .collect()
}

pub fn samples_from_text<R: BufRead>(reader: R) -> anyhow::Result<Vec<f64>> {
    let mut samples = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let content = line.split('#').next().unwrap_or("").trim();
        for token in content
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let value: f64 = token
                .parse()
                .with_context(|| format!("line {}: '{}' is not a number", line_no + 1, token))?;
            samples.push(value);
        }
    }
    Ok(samples)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
