//! Writes a small, deterministic estimator and its column list so the service can be run
//! without a training pipeline.
//!
//! Usage: `make_demo_artifacts [output_dir]`

use std::{env, fs, path::PathBuf};

use anyhow::{Context, anyhow};
use aqi_forecast::config::{DEFAULT_COLUMNS_PATH, DEFAULT_MODEL_PATH};
use estimator::{Aggregation, ArtifactWriter, Node};
use log::info;

const CITIES: [&str; 9] = [
    "Ahmedabad",
    "Bengaluru",
    "Chennai",
    "Delhi",
    "Hyderabad",
    "Kolkata",
    "Lucknow",
    "Mumbai",
    "Patna",
];

/// Month, Date_ and Year come first, the city one-hot columns follow.
fn columns() -> Vec<String> {
    ["Month", "Date_", "Year"]
        .into_iter()
        .map(str::to_string)
        .chain(CITIES.iter().map(|city| format!("City_{city}")))
        .collect()
}

fn city_feature(city: &str) -> anyhow::Result<usize> {
    CITIES
        .iter()
        .position(|c| *c == city)
        .map(|i| 3 + i)
        .ok_or_else(|| anyhow!("no demo column for city '{city}'"))
}

/// Winter months are worse, the monsoon is cleaner.
fn seasonal_tree() -> Vec<Node> {
    vec![
        Node::split(0, 2.5, 1, 2),
        Node::leaf(240.0),
        Node::split(0, 9.5, 3, 4),
        Node::split(0, 5.5, 5, 6),
        Node::leaf(260.0),
        Node::leaf(160.0),
        Node::leaf(80.0),
    ]
}

/// The Indo-Gangetic plain cities sit above the coastal ones.
fn regional_tree() -> anyhow::Result<Vec<Node>> {
    Ok(vec![
        Node::split(city_feature("Delhi")?, 0.5, 1, 2),
        Node::split(city_feature("Patna")?, 0.5, 3, 4),
        Node::leaf(320.0),
        Node::split(city_feature("Lucknow")?, 0.5, 5, 6),
        Node::leaf(250.0),
        Node::leaf(110.0),
        Node::leaf(230.0),
    ])
}

/// A mild improvement after 2020.
fn trend_tree() -> Vec<Node> {
    vec![
        Node::split(2, 2019.5, 1, 2),
        Node::leaf(190.0),
        Node::split(1, 15.5, 3, 4),
        Node::leaf(150.0),
        Node::leaf(145.0),
    ]
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let out = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&out).with_context(|| format!("cannot create {}", out.display()))?;

    let columns = columns();
    let trees = [seasonal_tree(), regional_tree()?, trend_tree()];
    let writer = ArtifactWriter::tree_ensemble(columns.len(), &trees, Aggregation::Mean, 0.0)
        .context("failed to lay out the demo ensemble")?;

    let model_path = out.join(DEFAULT_MODEL_PATH);
    writer
        .write(&model_path)
        .context("failed to write the estimator artifact")?;
    info!("wrote {}", model_path.display());

    let columns_path = out.join(DEFAULT_COLUMNS_PATH);
    let json = serde_json::to_string_pretty(&columns)?;
    fs::write(&columns_path, json)
        .with_context(|| format!("cannot write {}", columns_path.display()))?;
    info!("wrote {}", columns_path.display());

    Ok(())
}
