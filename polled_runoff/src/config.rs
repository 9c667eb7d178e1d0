// ********* Input data structures ***********

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;

/// A percentage, usually of the original ballots.
pub type Percentage = f64;

/// First-choice support (or any other per-candidate percentage), keyed by candidate name.
pub type SupportVector = HashMap<String, Percentage>;

/// The ideological group of a candidate. It selects which row of the
/// modifier table applies to the voters of this candidate.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Ideology {
    Progressive,
    Moderate,
    Conservative,
}

impl Ideology {
    pub const ALL: [Ideology; 3] = [
        Ideology::Progressive,
        Ideology::Moderate,
        Ideology::Conservative,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Ideology::Progressive => "progressive",
            Ideology::Moderate => "moderate",
            Ideology::Conservative => "conservative",
        }
    }
}

impl Display for Ideology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Ideology {
    type Err = SimulationErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "progressive" => Ok(Ideology::Progressive),
            "moderate" => Ok(Ideology::Moderate),
            "conservative" => Ok(Ideology::Conservative),
            _ => Err(SimulationErrors::UnknownIdeology(s.to_string())),
        }
    }
}

pub type IdeologyAssignment = HashMap<String, Ideology>;

/// For each ideology, the modifier applied to every candidate.
///
/// A modifier of -1 zeroes out the support for that candidate, 0 has no effect
/// and positive values amplify it.
pub type ModifierTable = HashMap<Ideology, HashMap<String, f64>>;

/// How the voters of each candidate would rank every other candidate.
///
/// Each row lists the other candidates in candidate order, with a percentage.
/// Rows produced by the builder sum to 100, or are all zero when the other
/// candidates have no support at all.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct PreferenceModel {
    pub(crate) rows: HashMap<String, Vec<(String, Percentage)>>,
    pub(crate) order: Vec<String>,
}

impl PreferenceModel {
    /// Builds a model from explicit rows, for example preferences collected
    /// from a poll of second choices.
    pub fn from_rows(rows: &[(String, Vec<(String, Percentage)>)]) -> PreferenceModel {
        PreferenceModel {
            rows: rows.iter().cloned().collect(),
            order: rows.iter().map(|(voter, _)| voter.clone()).collect(),
        }
    }

    /// Every voter splits evenly across all the other candidates.
    pub fn uniform(candidates: &[String]) -> PreferenceModel {
        let rows: Vec<(String, Vec<(String, Percentage)>)> = candidates
            .iter()
            .map(|voter| {
                let others: Vec<&String> = candidates.iter().filter(|c| *c != voter).collect();
                let share = if others.is_empty() {
                    0.0
                } else {
                    100.0 / others.len() as f64
                };
                (
                    voter.clone(),
                    others.iter().map(|c| ((*c).clone(), share)).collect(),
                )
            })
            .collect();
        PreferenceModel::from_rows(&rows)
    }

    pub fn row(&self, voter: &str) -> Option<&[(String, Percentage)]> {
        self.rows.get(voter).map(|r| r.as_slice())
    }

    /// The preference of the voters of `voter` for `ranked`. Candidates absent
    /// from a row have a preference of zero.
    pub fn preference(&self, voter: &str, ranked: &str) -> Option<Percentage> {
        let row = self.rows.get(voter)?;
        Some(
            row.iter()
                .find(|(name, _)| name == ranked)
                .map(|(_, p)| *p)
                .unwrap_or(0.0),
        )
    }

    /// The voter-candidates, in the order they were provided.
    pub fn voters(&self) -> &[String] {
        &self.order
    }
}

// ******** Output data structures *********

/// Snapshot of one round of the elimination.
#[derive(PartialEq, Debug, Clone)]
pub struct RoundRecord {
    /// 1-based
    pub round: u32,
    /// Share of the original ballots held by each active candidate.
    pub tally: Vec<(String, Percentage)>,
    /// Share of the ballots still active held by each active candidate.
    pub active_shares: Vec<(String, Percentage)>,
    /// The tally of the previous round, if any.
    pub previous_tally: Option<Vec<(String, Percentage)>>,
    /// The active shares of the previous round, if any.
    pub previous_active_shares: Option<Vec<(String, Percentage)>>,
    /// The lowest candidate of this round. It is also filled for the
    /// round in which a majority winner is found, although nobody gets
    /// eliminated then.
    pub eliminated: Option<String>,
    pub exhausted: Percentage,
    pub redistributed: Percentage,
    /// What each remaining candidate received from the eliminated candidate.
    pub transfers: Vec<(String, Percentage)>,
    /// Percentage of the original ballots that are still active.
    pub total_active: Percentage,
    pub is_final: bool,
}

impl RoundRecord {
    pub fn vote_share(&self, candidate: &str) -> Option<Percentage> {
        lookup(&self.tally, candidate)
    }

    pub fn active_share(&self, candidate: &str) -> Option<Percentage> {
        lookup(&self.active_shares, candidate)
    }

    /// Change of the share of the original ballots since the previous round.
    /// Zero in the first round.
    pub fn vote_gain(&self, candidate: &str) -> Option<Percentage> {
        let current = self.vote_share(candidate)?;
        match &self.previous_tally {
            Some(prev) => Some(current - lookup(prev, candidate).unwrap_or(0.0)),
            None => Some(0.0),
        }
    }

    /// Change of active share since the previous round. Zero in the first round.
    pub fn active_share_gain(&self, candidate: &str) -> Option<Percentage> {
        let current = self.active_share(candidate)?;
        match &self.previous_active_shares {
            Some(prev) => Some(current - lookup(prev, candidate).unwrap_or(0.0)),
            None => Some(0.0),
        }
    }
}

fn lookup(v: &[(String, Percentage)], candidate: &str) -> Option<Percentage> {
    v.iter().find(|(c, _)| c == candidate).map(|(_, p)| *p)
}

#[derive(PartialEq, Debug, Clone)]
pub struct Winner {
    pub name: String,
    /// Share of the original ballots.
    pub votes: Percentage,
    /// Share of the ballots still active in the winning round.
    pub active_share: Percentage,
    pub round: u32,
    pub total_active: Percentage,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SimulationResult {
    pub rounds: Vec<RoundRecord>,
    pub winner: Option<Winner>,
}

/// Errors raised by the validation of the inputs, before anything is computed.
#[derive(PartialEq, Debug, Clone)]
pub enum SimulationErrors {
    EmptyElection,
    DuplicateCandidate(String),
    UnknownCandidate(String),
    UnknownIdeology(String),
    MissingIdeology(String),
    MissingModifier {
        ideology: Ideology,
        candidate: String,
    },
    MissingSupport(String),
    InvalidSupport {
        candidate: String,
        value: Percentage,
    },
    SupportNotNormalized(Percentage),
    MissingExhaustionRate(String),
    ExhaustionOutOfRange {
        candidate: String,
        rate: Percentage,
    },
    MissingPreferenceRow(String),
    InvalidPreference {
        voter: String,
        ranked: String,
        value: Percentage,
    },
}

impl Error for SimulationErrors {}

impl Display for SimulationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationErrors::EmptyElection => write!(f, "no candidates were provided"),
            SimulationErrors::DuplicateCandidate(c) => write!(f, "candidate {c:?} appears twice"),
            SimulationErrors::UnknownCandidate(c) => write!(f, "unknown candidate {c:?}"),
            SimulationErrors::UnknownIdeology(s) => write!(f, "unknown ideology {s:?}"),
            SimulationErrors::MissingIdeology(c) => {
                write!(f, "candidate {c:?} has no ideology assigned")
            }
            SimulationErrors::MissingModifier {
                ideology,
                candidate,
            } => write!(
                f,
                "the modifier table has no entry for ideology {ideology} and candidate {candidate:?}"
            ),
            SimulationErrors::MissingSupport(c) => {
                write!(f, "candidate {c:?} has no first-choice support")
            }
            SimulationErrors::InvalidSupport { candidate, value } => write!(
                f,
                "candidate {candidate:?} has an invalid support of {value}"
            ),
            SimulationErrors::SupportNotNormalized(total) => write!(
                f,
                "first-choice support sums to {total} instead of 100"
            ),
            SimulationErrors::MissingExhaustionRate(c) => {
                write!(f, "candidate {c:?} has no exhaustion rate")
            }
            SimulationErrors::ExhaustionOutOfRange { candidate, rate } => write!(
                f,
                "exhaustion rate {rate} of candidate {candidate:?} is not within [0, 100]"
            ),
            SimulationErrors::MissingPreferenceRow(c) => {
                write!(f, "the preference model has no row for candidate {c:?}")
            }
            SimulationErrors::InvalidPreference {
                voter,
                ranked,
                value,
            } => write!(
                f,
                "the preference of {voter:?} voters for {ranked:?} is invalid: {value}"
            ),
        }
    }
}
