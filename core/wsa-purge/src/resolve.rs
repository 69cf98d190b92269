//! Reports which `.wsa` directory purge requests would go to.

use std::path::Path;
use wsa_core::{DiscoverySource, SignalDirectory};

use crate::app::{App, CommandError};

fn describe_source(source: DiscoverySource) -> String {
    match source {
        DiscoverySource::Explicit => "explicit path".to_string(),
        DiscoverySource::FirstGuess => "account root guess".to_string(),
        DiscoverySource::Backtrace { levels: 0 } => "working directory".to_string(),
        DiscoverySource::Backtrace { levels: 1 } => "1 level up".to_string(),
        DiscoverySource::Backtrace { levels } => format!("{levels} levels up"),
    }
}

pub fn render(directory: &SignalDirectory) -> String {
    format!(
        "{} ({})",
        directory.path().display(),
        describe_source(directory.source())
    )
}

pub fn run(app: &App, path: Option<&Path>) -> Result<(), CommandError> {
    let directory = app.signal.resolve(path)?;
    println!("{}", render(&directory));
    Ok(())
}
