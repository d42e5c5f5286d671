use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::RunError;

/// Run environment: model input, seed and output destination.
#[derive(Debug)]
pub struct Environment<I = ()> {
    input_json: Map<String, Value>,
    pub input: Option<I>,
    pub seed: Option<u64>,
    pub replicate: u64,
    output: Value,
}

fn take_u64(fields: &mut Map<String, Value>, key: &str) -> Option<u64> {
    fields.remove(key).as_ref().and_then(Value::as_u64)
}

impl Environment {
    /// Split a run document into the model input, the run-level `seed` and
    /// `replicate` fields lifted out of it, and the output section.
    pub fn from_json(mut data: Value) -> Self {
        let mut input_json = match data.get_mut("input").map(Value::take) {
            Some(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        let seed = take_u64(&mut input_json, "seed");
        let replicate = take_u64(&mut input_json, "replicate").unwrap_or_default();
        let output = data.get_mut("output").map(Value::take).unwrap_or_default();
        Self {
            input_json,
            input: None,
            seed,
            replicate,
            output,
        }
    }

    /// Read a JSON document, e.g. from stdin.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, RunError> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        if raw.trim().is_empty() {
            return Err(RunError::EmptyInput);
        }
        let data: Value = serde_json::from_str(&raw)?;
        Ok(Self::from_json(data))
    }

    /// Read a `.toml` or JSON file.
    pub fn from_path(path: &Path) -> Result<Self, RunError> {
        let raw = fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Err(RunError::EmptyInput);
        }
        let data: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&raw)?,
            _ => serde_json::from_str(&raw)?,
        };
        Ok(Self::from_json(data))
    }

    pub fn with_input_type<I: DeserializeOwned>(self) -> Result<Environment<I>, RunError> {
        let input_value = Value::Object(self.input_json.clone());
        let input = serde_json::from_value(input_value)?;
        Ok(Environment {
            input_json: self.input_json,
            input: Some(input),
            seed: self.seed,
            replicate: self.replicate,
            output: self.output,
        })
    }
}

impl<I: DeserializeOwned> Environment<I> {
    /// Load from `path` if given, otherwise from stdin.
    pub fn load(path: Option<&Path>) -> Result<Self, RunError> {
        let env = match path {
            Some(path) => Environment::from_path(path)?,
            None => Environment::from_reader(io::stdin().lock())?,
        };
        env.with_input_type::<I>()
    }
}

impl<I> Environment<I> {
    pub fn input_json(&self) -> &Map<String, Value> {
        &self.input_json
    }

    /// Directory for CSV output: a flat `filesystem` section, or the
    /// `default` profile (else the first one) when profiles are given.
    pub fn output_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = filesystem_dir(&self.output) {
            return Some(dir);
        }
        let profiles = self.output.get("profile")?.as_object()?;
        let profile = profiles.get("default").or_else(|| profiles.values().next())?;
        filesystem_dir(profile)
    }

    /// Write a CSV file into the output directory, or to stdout without one.
    pub fn write_csv(
        &self,
        filename: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), RunError> {
        match self.output_dir() {
            Some(dir) => {
                fs::create_dir_all(&dir)?;
                let file = fs::File::create(dir.join(filename))?;
                write_records(file, headers, rows)
            }
            None => write_records(io::stdout().lock(), headers, rows),
        }
    }
}

fn filesystem_dir(section: &Value) -> Option<PathBuf> {
    if section.get("spec")?.as_str()? != "filesystem" {
        return None;
    }
    section.get("dir")?.as_str().map(PathBuf::from)
}

fn write_records<W: Write>(writer: W, headers: &[&str], rows: &[Vec<String>]) -> Result<(), RunError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nat_risk::{ExecutionMode, InfectivityModel};
    use serde_json::json;

    use crate::input::RunInput;

    fn run_document(input_extra: Value, output: Value) -> Value {
        let mut input = json!({
            "parameters": {
                "doubling_time": 0.85,
                "doubling_time_sd": 0.05,
                "volume_transfused": 20.0,
                "volume_transfused_range": [15.0, 25.0],
                "k": 0.316,
                "k_gamma_shape": 2.0,
                "k_gamma_scale": 0.158,
                "lod50": 3.0,
                "lod50_sd": 0.5,
                "lod95_lod50_ratio": 4.16,
                "pool_size": 16,
                "retests": 1,
                "incidence": 0.3,
                "incidence_sd": 0.05
            }
        });
        if let (Some(base), Some(extra)) = (input.as_object_mut(), input_extra.as_object()) {
            base.extend(extra.clone());
        }
        json!({ "input": input, "output": output })
    }

    #[test]
    fn test_run_document_lifts_seed_and_replicate() {
        let data = run_document(
            json!({
                "seed": 42,
                "replicate": 3,
                "model": "worst_case",
                "execution": { "mode": "pooled", "workers": 2 }
            }),
            json!({ "spec": "filesystem", "dir": "runs/pool16" }),
        );
        let env = Environment::from_json(data).with_input_type::<RunInput>().unwrap();
        assert_eq!(env.seed, Some(42));
        assert_eq!(env.replicate, 3);
        assert!(!env.input_json().contains_key("seed"));
        assert!(!env.input_json().contains_key("replicate"));

        let input = env.input.as_ref().unwrap();
        assert_eq!(input.parameters.pool_size.get(), 16);
        assert_eq!(input.parameters.retests.get(), 1);
        assert_eq!(input.model, InfectivityModel::WorstCase);
        assert_eq!(input.execution, ExecutionMode::Pooled { workers: Some(2) });
        assert_eq!(input.settings(env.seed).seed, 42);
        assert_eq!(env.output_dir(), Some(PathBuf::from("runs/pool16")));
    }

    #[test]
    fn test_fractional_pool_size_is_rejected() {
        let mut data = run_document(json!({}), Value::Null);
        data["input"]["parameters"]["pool_size"] = json!(1.5);
        let err = Environment::from_json(data).with_input_type::<RunInput>().unwrap_err();
        assert!(matches!(err, RunError::Json(_)), "{err}");
    }

    #[test]
    fn test_profiled_output_prefers_default() {
        let output = json!({
            "profile": {
                "archive": { "spec": "filesystem", "dir": "archive" },
                "default": { "spec": "filesystem", "dir": "latest" }
            }
        });
        let env = Environment::from_json(run_document(json!({}), output));
        assert_eq!(env.output_dir(), Some(PathBuf::from("latest")));
    }

    #[test]
    fn test_profiled_output_without_default() {
        let output = json!({
            "profile": { "nightly": { "spec": "filesystem", "dir": "nightly" } }
        });
        let env = Environment::from_json(run_document(json!({}), output));
        assert_eq!(env.output_dir(), Some(PathBuf::from("nightly")));
    }

    #[test]
    fn test_stdout_run_without_seed() {
        let mut data = run_document(json!({}), Value::Null);
        data.as_object_mut().unwrap().remove("output");
        let env = Environment::from_json(data).with_input_type::<RunInput>().unwrap();
        assert_eq!(env.seed, None);
        assert_eq!(env.replicate, 0);
        assert_eq!(env.output_dir(), None);

        let input = env.input.unwrap();
        assert_eq!(input.model, InfectivityModel::Continuous);
        assert_eq!(input.settings(env.seed), input.uncertainty);

        let env = Environment::from_json(json!({ "output": { "spec": "stdout" } }));
        assert_eq!(env.output_dir(), None);
        assert!(env.input_json().is_empty());
    }

    #[test]
    fn test_blank_stdin_is_an_error() {
        let err = Environment::from_reader("  \n".as_bytes()).unwrap_err();
        assert!(matches!(err, RunError::EmptyInput));
        let raw = run_document(json!({ "seed": 9 }), Value::Null).to_string();
        let env = Environment::from_reader(raw.as_bytes()).unwrap();
        assert_eq!(env.seed, Some(9));
    }

    #[test]
    fn test_from_toml_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(
            &path,
            r#"[input]
seed = 11
model = "continuous"

[input.parameters]
doubling_time = 0.85
doubling_time_sd = 0.05
volume_transfused = 20.0
volume_transfused_range = [15.0, 25.0]
k = 0.316
k_gamma_shape = 2.0
k_gamma_scale = 0.158
lod50 = 3.0
lod50_sd = 0.5
lod95_lod50_ratio = 4.16
pool_size = 6
retests = 2
incidence = 0.3
incidence_sd = 0.05

[input.uncertainty]
n_bs = 0

[output]
spec = "filesystem"
dir = "out"
"#,
        )
        .unwrap();
        let env = Environment::<RunInput>::load(Some(&path)).unwrap();
        assert_eq!(env.seed, Some(11));
        let input = env.input.as_ref().unwrap();
        assert_eq!(input.parameters.pool_size.get(), 6);
        assert_eq!(input.parameters.retests.get(), 2);
        assert_eq!(input.uncertainty.n_bs, 0);
        assert_eq!(env.output_dir(), Some(PathBuf::from("out")));
    }

    #[test]
    fn test_write_csv_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results");
        let env = Environment::from_json(json!({
            "output": { "spec": "filesystem", "dir": out.to_str().unwrap() }
        }));
        env.write_csv(
            "summary.csv",
            &["metric", "estimate"],
            &[vec!["risk_days".to_string(), "7.5".to_string()]],
        )
        .unwrap();
        let written = fs::read_to_string(out.join("summary.csv")).unwrap();
        assert_eq!(written, "metric,estimate\nrisk_days,7.5\n");
    }
}
