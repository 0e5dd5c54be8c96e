use crate::tally::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CatalogMovie {
    pub id: String,
    pub title: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(rename = "rankCount")]
    pub rank_count: Option<usize>,
    #[serde(rename = "maxIterations")]
    pub max_iterations: Option<u32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    /// Relative to the directory of the configuration file.
    #[serde(rename = "ballotsPath")]
    pub ballots_path: Option<String>,
    #[serde(rename = "catalogPath")]
    pub catalog_path: Option<String>,
    pub catalog: Option<Vec<CatalogMovie>>,
    pub rules: Option<RulesConfig>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

impl Default for TallyConfig {
    fn default() -> Self {
        TallyConfig {
            contest_name: "Best Picture".to_string(),
            contest_date: None,
            ballots_path: None,
            catalog_path: None,
            catalog: None,
            rules: None,
            output_path: None,
        }
    }
}

/// The configuration echoed at the top of the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    #[serde(rename = "rankCount")]
    pub rank_count: usize,
    #[serde(rename = "maxIterations")]
    pub max_iterations: u32,
}

pub fn read_config(path: &str) -> TallyResult<TallyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: TallyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(config)
}

/// Reads a catalog file: an array of movies, of which only `id` and `title` are kept.
pub fn read_catalog(path: &str) -> TallyResult<Vec<CatalogMovie>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let movies: Vec<CatalogMovie> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_catalog: {} movies in {:?}", movies.len(), path);
    Ok(movies)
}

pub fn read_summary(path: &str) -> TallyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}
