//! Step outputs and exported variables for the surrounding workflow.
//!
//! Values are appended to the files named by `GITHUB_OUTPUT` and `GITHUB_ENV`.
//! Outside a workflow (no such files) they are printed to stdout instead.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::poller::ReadyDeployment;
use crate::summary::TestCounters;

pub const DEPLOYMENT_URL_OUTPUT: &str = "deployment-url";
pub const DEPLOYMENT_ID_OUTPUT: &str = "deployment-id";
pub const DEPLOYMENT_URL_VAR: &str = "VERCEL_DEPLOYMENT_URL";
pub const DEPLOYMENT_ID_VAR: &str = "VERCEL_DEPLOYMENT_ID";
pub const FOLDER_NAME_OUTPUT: &str = "folder_name";

/// Writer for workflow command files.
#[derive(Debug, Clone, Default)]
pub struct StepOutputs {
    output_file: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

impl StepOutputs {
    pub fn new(output_file: Option<PathBuf>, env_file: Option<PathBuf>) -> Self {
        StepOutputs {
            output_file,
            env_file,
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        StepOutputs::new(path("GITHUB_OUTPUT"), path("GITHUB_ENV"))
    }

    /// Set a step output.
    pub fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        debug!(name, value, "set output");
        match &self.output_file {
            Some(path) => append_entry(path, name, value),
            None => {
                println!("{}={}", name, value);
                Ok(())
            }
        }
    }

    /// Export an environment variable to later steps.
    pub fn export_variable(&self, name: &str, value: &str) -> io::Result<()> {
        debug!(name, value, "export variable");
        match &self.env_file {
            Some(path) => append_entry(path, name, value),
            None => {
                println!("{}={}", name, value);
                Ok(())
            }
        }
    }
}

/// Publish the ready deployment's URL and id.
pub fn publish_deployment(outputs: &StepOutputs, ready: &ReadyDeployment) -> io::Result<()> {
    outputs.set_output(DEPLOYMENT_URL_OUTPUT, &ready.url)?;
    outputs.set_output(DEPLOYMENT_ID_OUTPUT, &ready.id)?;
    outputs.export_variable(DEPLOYMENT_URL_VAR, &ready.url)?;
    outputs.export_variable(DEPLOYMENT_ID_VAR, &ready.id)?;
    Ok(())
}

/// Publish test counters as `total`, `passed`, `failed`, `flaky`, `skipped`.
pub fn publish_counters(outputs: &StepOutputs, counters: &TestCounters) -> io::Result<()> {
    outputs.set_output("total", &counters.total.to_string())?;
    outputs.set_output("passed", &counters.passed.to_string())?;
    outputs.set_output("failed", &counters.failed.to_string())?;
    outputs.set_output("flaky", &counters.flaky.to_string())?;
    outputs.set_output("skipped", &counters.skipped.to_string())?;
    Ok(())
}

/// Mark the step failed with an error annotation.
pub fn fail_step(message: &str) {
    println!("::error::{}", escape_data(message));
}

fn append_entry(path: &Path, name: &str, value: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if value.contains('\n') || value.contains('\r') {
        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        writeln!(file, "{}<<{}", name, delimiter)?;
        writeln!(file, "{}", value)?;
        writeln!(file, "{}", delimiter)?;
    } else {
        writeln!(file, "{}={}", name, value)?;
    }
    Ok(())
}

fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
