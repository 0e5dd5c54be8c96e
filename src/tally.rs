use log::{debug, info, warn};

use awards_rcv::builder::Builder;
use awards_rcv::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tally::config_reader::*;
use crate::tally::io_json::read_ballots;

mod config_reader;
mod io_json;

#[derive(Debug, Snafu)]
pub enum TallyCliError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Ballot at position {position} is malformed: {reason}"))]
    MalformedBallot { position: usize, reason: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("No ballot file: pass --input or set ballotsPath in the configuration"))]
    MissingBallots {},
    #[snafu(display("Invalid tabulation rules"))]
    InvalidRules { source: TallyErrors },
    #[snafu(display("The tabulation failed"))]
    Tabulation { source: TallyErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type TallyResult<T> = Result<T, TallyCliError>;

fn validate_rules(
    rules_config: &Option<RulesConfig>,
    rank_count: Option<usize>,
) -> TallyResult<TallyRules> {
    let rc = rules_config.clone().unwrap_or_default();
    let rules = TallyRules {
        rank_count: rank_count
            .or(rc.rank_count)
            .unwrap_or(TallyRules::DEFAULT_RANK_COUNT),
        max_iterations: rc
            .max_iterations
            .unwrap_or(TallyRules::DEFAULT_RULES.max_iterations),
    };
    rules.validate().context(InvalidRulesSnafu {})?;
    Ok(rules)
}

fn resolve(root: &Path, path: &str) -> String {
    let p: PathBuf = root.join(path);
    p.as_path().display().to_string()
}

fn read_full_catalog(config: &TallyConfig, root: &Path) -> TallyResult<Vec<CatalogEntry>> {
    let mut movies: Vec<CatalogMovie> = config.catalog.clone().unwrap_or_default();
    if let Some(p) = &config.catalog_path {
        let p2 = resolve(root, p);
        info!("Attempting to read catalog file {:?}", p2);
        movies.extend(read_catalog(&p2)?);
    }
    // The first entry of an id wins, inline entries come first.
    Ok(movies
        .into_iter()
        .map(|m| CatalogEntry {
            id: m.id,
            title: m.title,
        })
        .collect())
}

fn build_summary_js(
    config: &TallyConfig,
    rules: &TallyRules,
    stats: &ParticipationStats,
    result: &TabulationResult,
) -> JSValue {
    let c = OutputConfig {
        contest: config.contest_name.clone(),
        date: config.contest_date.clone(),
        rank_count: rules.rank_count,
        max_iterations: rules.max_iterations,
    };
    json!({
        "config": c,
        "participation": stats,
        "results": result })
}

fn write_summary(out: Option<&str>, pretty_js: &str) -> TallyResult<()> {
    match out {
        None | Some("stdout") => {
            println!("{}", pretty_js);
        }
        Some(path) => {
            fs::write(path, pretty_js).context(WritingOutputSnafu { path })?;
            info!("Summary written to {:?}", path);
        }
    }
    Ok(())
}

/// Runs the tabulation described by the arguments and returns the summary.
pub fn run_election(args: &Args) -> TallyResult<JSValue> {
    let (config, root_p) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root_p)
        }
        None => (TallyConfig::default(), PathBuf::from(".")),
    };
    info!("config: {:?}", config);

    let rules = validate_rules(&config.rules, args.rank_count)?;

    let ballots_path = args
        .input
        .clone()
        .or_else(|| config.ballots_path.as_ref().map(|p| resolve(&root_p, p)))
        .context(MissingBallotsSnafu {})?;
    info!("Attempting to read ballot file {:?}", ballots_path);
    let records = read_ballots(&ballots_path)?;

    let catalog = read_full_catalog(&config, &root_p)?;
    debug!("catalog: {:?}", catalog);

    let mut builder = Builder::new(&rules)
        .context(TabulationSnafu {})?
        .catalog(&catalog)
        .context(TabulationSnafu {})?;
    builder.add_records(&records).context(TabulationSnafu {})?;

    let stats = builder.participation();
    info!(
        "Participation: {} of {} ballots included, {} movies seen",
        stats.included_ballots, stats.total_ballots, stats.unique_movies_seen
    );

    let result = builder.tabulate().context(TabulationSnafu {})?;
    match &result.winner {
        Some(w) => info!(
            "Winner after {} rounds: {}",
            result.rounds.len(),
            result.titles.get(w).unwrap_or(w)
        ),
        None => warn!("No winner after {} rounds", result.rounds.len()),
    }

    // Assemble the final json
    let result_js = build_summary_js(&config, &rules, &stats, &result);
    let pretty_js_stats =
        serde_json::to_string_pretty(&result_js).context(SerializingJsonSnafu {})?;

    let out = args
        .out
        .clone()
        .or_else(|| config.output_path.as_ref().map(|p| resolve(&root_p, p)));
    write_summary(out.as_deref(), &pretty_js_stats)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(SerializingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(result_js)
}
