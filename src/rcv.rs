use log::{debug, info, warn};

use polled_runoff::builder::Builder;
use polled_runoff::*;
use snafu::{prelude::*, ErrorCompat, Snafu};

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;

pub use crate::rcv::config_reader::*;
use crate::rcv::io_common::{parse_adjustment, simplify_file_name};
use crate::rcv::io_csv::{read_csv_poll, write_csv_export};

#[derive(Debug, Snafu)]
pub enum RcvError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a positive index, found {content}"))]
    ParsingJsonNumber { content: String },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},

    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("CSV line {lineno} is missing columns"))]
    CsvLineToShort { lineno: usize },
    #[snafu(display("CSV line {lineno}: {content} is not a number"))]
    CsvNumber { lineno: usize, content: String },
    #[snafu(display("Error writing CSV"))]
    CsvWrite { source: csv::Error },

    #[snafu(display("No support found for candidate {name} in the configuration or the polls"))]
    MissingSupport { name: String },
    #[snafu(display("Invalid adjustment {content}, expected NAME=VALUE"))]
    InvalidAdjustment { content: String },
    #[snafu(display("Simulation error: {source}"))]
    Simulation { source: SimulationErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RcvResult<T> = Result<T, RcvError>;

fn fmt_number(x: Percentage) -> JSValue {
    json!(format!("{:.4}", x))
}

fn shares_to_json(shares: &[(String, Percentage)]) -> JSMap<String, JSValue> {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    for (name, p) in shares.iter() {
        m.insert(name.clone(), fmt_number(*p));
    }
    m
}

fn winner_to_json(w: &Winner) -> JSValue {
    json!({
        "name": w.name,
        "votes": fmt_number(w.votes),
        "activeShare": fmt_number(w.active_share),
        "round": w.round,
        "activeBallots": fmt_number(w.total_active),
    })
}

fn result_stats_to_json(rs: &SimulationResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round in rs.rounds.iter() {
        let tally_results: Vec<JSValue> = if round.is_final {
            let elected = rs.winner.as_ref().map(|w| w.name.clone());
            vec![json!({
                "elected": elected,
                "transfers": JSMap::new(),
            })]
        } else {
            let mut transfers = shares_to_json(&round.transfers);
            if round.exhausted > 0.0 {
                transfers.insert("exhausted".to_string(), fmt_number(round.exhausted));
            }
            vec![json!({
                "eliminated": round.eliminated,
                "transfers": transfers,
            })]
        };
        l.push(json!({
            "round": round.round,
            "tally": shares_to_json(&round.tally),
            "activeShares": shares_to_json(&round.active_shares),
            "activeBallots": fmt_number(round.total_active),
            "tallyResults": tally_results,
        }));
    }
    l
}

fn build_summary_js(config: &RcvConfig, rs: &SimulationResult) -> JSValue {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        jurisdiction: config.output_settings.contest_jurisdiction.clone(),
        office: config.output_settings.contest_office.clone(),
    };
    json!({
        "config": c,
        "results": result_stats_to_json(rs),
        "winner": rs.winner.as_ref().map(winner_to_json),
    })
}

/// Assembles the scenario from the configuration, the poll files and the
/// support adjustments, in this order.
fn build_scenario(
    config: &RcvConfig,
    root_dir: &Path,
    input_override: &Option<String>,
    adjustments: &[String],
) -> RcvResult<Builder> {
    // Candidates start from the configuration, polls overwrite their numbers.
    let mut builder = Builder::new();
    let mut has_support: HashSet<String> = HashSet::new();
    for c in config.candidates.iter() {
        let ideology: Ideology = c.ideology.parse().context(SimulationSnafu {})?;
        builder
            .add_candidate(
                &c.name,
                c.support.unwrap_or(0.0),
                c.exhaustion_rate.unwrap_or(0.0),
                ideology,
            )
            .context(SimulationSnafu {})?;
        if c.support.is_some() {
            has_support.insert(c.name.clone());
        }
    }

    let poll_sources: Vec<(String, PollSource)> = match input_override {
        Some(path) => vec![(path.clone(), PollSource::new("csv", path))],
        None => config
            .poll_sources
            .iter()
            .map(|cfs| {
                let p = root_dir.join(&cfs.file_path);
                (p.to_string_lossy().to_string(), cfs.clone())
            })
            .collect(),
    };

    for (path, cfs) in poll_sources.iter() {
        if cfs.provider != "csv" {
            whatever!("Provider {} not supported", cfs.provider);
        }
        info!("Reading poll file {}", path);
        let rows = read_csv_poll(path, cfs)?;
        for row in rows {
            if !builder.candidates().contains(&row.name) {
                warn!("Unknown candidate {:?} in poll file {}, skipping", row.name, path);
                continue;
            }
            builder
                .set_support(&row.name, row.support)
                .context(SimulationSnafu {})?;
            has_support.insert(row.name.clone());
            if let Some(e) = row.exhaustion_rate {
                builder
                    .set_exhaustion_rate(&row.name, e)
                    .context(SimulationSnafu {})?;
            }
        }
    }

    if let Some(name) = builder
        .candidates()
        .iter()
        .find(|c| !has_support.contains(*c))
    {
        return MissingSupportSnafu { name: name.clone() }.fail();
    }

    for (tag, row) in config.ideology_modifiers.iter() {
        let ideology: Ideology = tag.parse().context(SimulationSnafu {})?;
        for (name, modifier) in row.iter() {
            if !builder.candidates().contains(name) {
                warn!("Modifier for unknown candidate {:?}, skipping", name);
                continue;
            }
            builder.set_modifier(ideology, name, *modifier);
        }
    }
    if let Some(m) = config.default_modifier {
        builder.fill_missing_modifiers(m);
    }

    builder.normalize_support();

    for adj in adjustments.iter() {
        let (name, value) = parse_adjustment(adj).context(InvalidAdjustmentSnafu {
            content: adj.clone(),
        })?;
        debug!("build_scenario: adjusting {:?} to {:?}", name, value);
        builder
            .adjust_support(&name, value)
            .context(SimulationSnafu {})?;
    }

    Ok(builder)
}

pub fn run_simulation(
    config_path: &str,
    input_override: &Option<String>,
    adjustments: &[String],
    out_path: &Option<String>,
    check_summary_path: &Option<String>,
    csv_out_path: &Option<String>,
    abridged: bool,
) -> RcvResult<()> {
    let config_p = Path::new(config_path);
    let config = read_config(config_path)?;
    info!("config: {:?}", config);

    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let builder = build_scenario(&config, root_p, input_override, adjustments)?;
    info!("support: {:?}", builder.support());

    let model = builder.preference_model().context(SimulationSnafu {})?;
    for voter in model.voters() {
        debug!("preferences of {} voters: {:?}", voter, model.row(voter));
    }
    let result = run_elimination(
        builder.candidates(),
        builder.support(),
        builder.exhaustion_rates(),
        &model,
    )
    .context(SimulationSnafu {})?;

    if let Some(w) = &result.winner {
        println!(
            "{} wins in round {} with {:.1}% of the active ballots",
            w.name, w.round, w.active_share
        );
    }

    // Assemble the final json
    let result_js = build_summary_js(&config, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    let summary_out: Option<String> = match (out_path, &config.output_settings.output_directory) {
        (Some(p), _) => Some(p.clone()),
        (None, Some(dir)) => {
            let p = root_p.join(dir).join(format!(
                "{}_summary.json",
                simplify_file_name(config_path)
            ));
            Some(p.to_string_lossy().to_string())
        }
        (None, None) => None,
    };
    match summary_out {
        Some(p) if p == "stdout" => println!("{}", pretty_js_stats),
        Some(p) => {
            info!("Writing summary to {}", p);
            fs::write(&p, &pretty_js_stats).context(WritingFileSnafu { path: p.clone() })?;
        }
        None => {}
    }

    if let Some(p) = csv_out_path {
        info!("Writing CSV export to {}", p);
        write_csv_export(p, &result, abridged)?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        debug!("summary: {:?}", summary_ref);
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

fn run_simulation_test(test_name: &str, config_lpath: &str, summary_lpath: &str) -> RcvResult<()> {
    let test_dir = format!("{}/test_data", env!("CARGO_MANIFEST_DIR"));
    info!("Running test {}", test_name);
    let res = run_simulation(
        &format!("{}/{}/{}", test_dir, test_name, config_lpath),
        &None,
        &[],
        &None,
        &Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
        &None,
        false,
    );
    if let Err(e) = &res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(e) {
            eprintln!("trace: {}", bt);
        }
    }
    res
}

pub fn test_wrapper(test_name: &str) {
    let res = run_simulation_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    );
    assert!(res.is_ok(), "{} failed: {:?}", test_name, res);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_way_exhaustion() {
        test_wrapper("three_way_exhaustion");
    }

    #[test]
    fn boundary_majority() {
        test_wrapper("boundary_majority");
    }

    #[test]
    fn poll_override() {
        test_wrapper("poll_override");
    }

    #[test]
    fn nyc_2025() {
        test_wrapper("nyc_2025");
    }

    #[test]
    fn nyc_2025_abridged_export() {
        let config_path = format!(
            "{}/test_data/nyc_2025/nyc_2025_config.json",
            env!("CARGO_MANIFEST_DIR")
        );
        let config = read_config(&config_path).unwrap();
        let builder = build_scenario(&config, Path::new("."), &None, &[]).unwrap();
        let rs = builder.run().unwrap();
        assert_eq!(rs.rounds.len(), 5);

        let mut buf: Vec<u8> = Vec::new();
        crate::rcv::io_csv::write_rounds(&mut buf, &rs, true).unwrap();
        let s = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines[0], "Candidate,First Round,Round 4,Round 5");
        assert_eq!(lines[1], "Andrew Cuomo,48.5,49.5,50.2");
        // 9 candidates and the two ballot rows.
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[10], "Ballots Remaining,100.0,99.0,98.4");
    }

    fn small_config() -> RcvConfig {
        serde_json::from_value(json!({
            "outputSettings": {"contestName": "Small"},
            "candidates": [
                {"name": "Alice", "support": 40, "ideology": "moderate"},
                {"name": "Bob", "support": 35, "exhaustionRate": 10, "ideology": "progressive"},
                {"name": "Carol", "support": 25, "ideology": "conservative"}
            ],
            "ideologyModifiers": {"progressive": {"Alice": 0.5, "Zed": 1.0}},
            "defaultModifier": 0
        }))
        .unwrap()
    }

    #[test]
    fn scenario_with_adjustment() {
        let config = small_config();
        let builder = build_scenario(
            &config,
            Path::new("."),
            &None,
            &["Alice=50".to_string()],
        )
        .unwrap();
        let support = builder.support();
        assert!((support["Alice"] - 50.0).abs() < 1e-9);
        assert!((support["Bob"] - 35.0 * 50.0 / 60.0).abs() < 1e-9);
        assert!((support["Carol"] - 25.0 * 50.0 / 60.0).abs() < 1e-9);
        assert_eq!(builder.exhaustion_rates()["Alice"], 0.0);
        assert_eq!(builder.exhaustion_rates()["Bob"], 10.0);
    }

    #[test]
    fn scenario_errors() {
        let config = small_config();
        let res = build_scenario(&config, Path::new("."), &None, &["Alice".to_string()]);
        assert!(matches!(res, Err(RcvError::InvalidAdjustment { .. })));

        let res = build_scenario(&config, Path::new("."), &None, &["Dan=10".to_string()]);
        assert!(matches!(
            res,
            Err(RcvError::Simulation {
                source: SimulationErrors::UnknownCandidate(_)
            })
        ));

        let mut config = small_config();
        config.candidates[2].support = None;
        let res = build_scenario(&config, Path::new("."), &None, &[]);
        assert!(matches!(res, Err(RcvError::MissingSupport { .. })));

        let mut config = small_config();
        config.candidates[2].ideology = "libertarian".to_string();
        let res = build_scenario(&config, Path::new("."), &None, &[]);
        assert!(matches!(
            res,
            Err(RcvError::Simulation {
                source: SimulationErrors::UnknownIdeology(_)
            })
        ));
    }

    #[test]
    fn summary_layout() {
        let config = small_config();
        let builder = build_scenario(&config, Path::new("."), &None, &[]).unwrap();
        let rs = builder.run().unwrap();
        let js = build_summary_js(&config, &rs);
        assert_eq!(js["config"]["contest"], json!("Small"));
        let results = js["results"].as_array().unwrap();
        assert_eq!(results.len(), rs.rounds.len());
        assert_eq!(results[0]["round"], json!(1));
        assert_eq!(results[0]["tally"]["Alice"], json!("40.0000"));
        assert_eq!(results[0]["activeBallots"], json!("100.0000"));
        assert_eq!(
            results[0]["tallyResults"][0]["eliminated"],
            json!("Carol")
        );
        let last = results.last().unwrap();
        assert_eq!(
            last["tallyResults"][0]["elected"],
            js["winner"]["name"]
        );
    }
}
