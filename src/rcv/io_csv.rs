// Primitives for reading polling numbers from CSV files and exporting the rounds.

use std::fs::File;
use std::io;

use log::debug;
use polled_runoff::{Percentage, RoundRecord, SimulationResult};
use snafu::prelude::*;

use crate::rcv::*;

/// One line of a poll file.
#[derive(PartialEq, Debug, Clone)]
pub struct PollRow {
    pub name: String,
    pub support: Percentage,
    pub exhaustion_rate: Option<Percentage>,
}

pub fn read_csv_poll(path: &str, cfs: &PollSource) -> RcvResult<Vec<PollRow>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_poll_records(rdr, cfs)
}

pub fn read_poll_records<R: io::Read>(
    rdr: csv::Reader<R>,
    cfs: &PollSource,
) -> RcvResult<Vec<PollRow>> {
    let first_row = cfs.first_row_index()?;
    let name_idx = cfs.name_column_index()?;
    let support_idx = cfs.support_column_index()?;
    let exhaustion_idx_o = cfs.exhaustion_column_index()?;

    let mut res: Vec<PollRow> = Vec::new();
    // The index starts at 1 to respect most conventions in the spreadsheet world
    for (idx, line_r) in rdr.into_records().enumerate().skip(first_row - 1) {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("read_poll_records: lineno: {:?} row: {:?}", lineno, line);
        if line.iter().all(|s| s.trim().is_empty()) {
            continue;
        }
        let name = line
            .get(name_idx)
            .context(CsvLineToShortSnafu { lineno })?
            .trim()
            .to_string();
        let support = parse_percentage(line.get(support_idx), lineno)?
            .context(CsvLineToShortSnafu { lineno })?;
        let exhaustion_rate = match exhaustion_idx_o {
            Some(exhaustion_idx) => parse_percentage(line.get(exhaustion_idx), lineno)?,
            None => None,
        };
        res.push(PollRow {
            name,
            support,
            exhaustion_rate,
        });
    }
    Ok(res)
}

// Empty cells are treated as missing. A trailing % sign is accepted.
fn parse_percentage(cell: Option<&str>, lineno: usize) -> RcvResult<Option<Percentage>> {
    let s = match cell.map(|s| s.trim().trim_end_matches('%').trim()) {
        None => return Ok(None),
        Some(s) if s.is_empty() => return Ok(None),
        Some(s) => s,
    };
    match s.parse::<Percentage>() {
        Ok(x) => Ok(Some(x)),
        Err(_) => CsvNumberSnafu {
            lineno,
            content: s.to_string(),
        }
        .fail(),
    }
}

/// The indices of the rounds kept in the abridged export: the first round,
/// every third round and the last two rounds.
pub fn abridged_rounds(num_rounds: usize) -> Vec<usize> {
    (0..num_rounds)
        .filter(|idx| *idx == 0 || idx % 3 == 0 || idx + 2 >= num_rounds)
        .collect()
}

pub fn write_csv_export(path: &str, rs: &SimulationResult, abridged: bool) -> RcvResult<()> {
    let file = File::create(path).context(WritingFileSnafu { path })?;
    write_rounds(file, rs, abridged)
}

/// Writes the share of the active ballots of every candidate, round by round.
pub fn write_rounds<W: io::Write>(w: W, rs: &SimulationResult, abridged: bool) -> RcvResult<()> {
    let first_round: &RoundRecord = match rs.rounds.first() {
        Some(r) => r,
        None => return Ok(()),
    };
    let included: Vec<&RoundRecord> = if abridged {
        abridged_rounds(rs.rounds.len())
            .iter()
            .map(|idx| &rs.rounds[*idx])
            .collect()
    } else {
        rs.rounds.iter().collect()
    };
    let later_rounds = &included[1..];

    let mut wtr = csv::Writer::from_writer(w);

    let mut header: Vec<String> = vec!["Candidate".to_string(), "First Round".to_string()];
    for r in later_rounds.iter() {
        header.push(format!("Round {}", r.round));
    }
    wtr.write_record(&header).context(CsvWriteSnafu {})?;

    // Candidates without first-choice support are left out.
    let mut sorted_candidates: Vec<(String, Percentage)> = first_round
        .tally
        .iter()
        .filter(|(_, p)| *p > 0.0)
        .cloned()
        .collect();
    sorted_candidates.sort_by(|(_, p1), (_, p2)| p2.total_cmp(p1));

    for (name, _) in sorted_candidates.iter() {
        let mut line: Vec<String> = vec![
            name.clone(),
            fmt_share(first_round.active_share(name).unwrap_or(0.0)),
        ];
        // Eliminated candidates, and candidates down to no votes, get a dash.
        for r in later_rounds.iter() {
            line.push(match (r.vote_share(name), r.active_share(name)) {
                (Some(votes), Some(share)) if votes != 0.0 => fmt_share(share),
                _ => "-".to_string(),
            });
        }
        wtr.write_record(&line).context(CsvWriteSnafu {})?;
    }

    let mut remaining: Vec<String> = vec!["Ballots Remaining".to_string(), fmt_share(100.0)];
    let mut exhausted: Vec<String> = vec!["Ballots Exhausted".to_string(), fmt_share(0.0)];
    for r in later_rounds.iter() {
        remaining.push(fmt_share(r.total_active));
        exhausted.push(fmt_share(100.0 - r.total_active));
    }
    wtr.write_record(&remaining).context(CsvWriteSnafu {})?;
    wtr.write_record(&exhausted).context(CsvWriteSnafu {})?;
    wtr.flush().context(WritingFileSnafu { path: "csv export" })?;
    Ok(())
}

fn fmt_share(x: Percentage) -> String {
    format!("{:.1}", x)
}
