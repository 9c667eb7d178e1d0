mod config;
mod preferences;

pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::HashSet;

pub use crate::config::*;
pub use crate::preferences::build_preference_model;

use crate::preferences::check_candidates;

// **** Private structures ****

type RoundId = u32;

/// Tolerance when checking that the initial shares sum to 100.
const SUPPORT_TOLERANCE: Percentage = 0.01;
/// Tolerance of the floating-point reconciliation of the totals.
const RECONCILE_TOLERANCE: Percentage = 0.0001;
/// Share of the active ballots that must be strictly exceeded to win.
const MAJORITY: Percentage = 50.0;

// The state carried from one round to the next.
#[derive(PartialEq, Debug, Clone)]
struct RoundState {
    // Active candidates with their share of the original ballots, in candidate order.
    tally: Vec<(String, Percentage)>,
    total_active: Percentage,
}

impl RoundState {
    fn active_total(&self) -> Percentage {
        self.tally.iter().map(|(_, p)| *p).sum()
    }

    fn active_shares(&self) -> Vec<(String, Percentage)> {
        let total = self.active_total();
        self.tally
            .iter()
            .map(|(c, p)| {
                let share = if total > 0.0 { *p / total * 100.0 } else { 0.0 };
                (c.clone(), share)
            })
            .collect()
    }
}

// The outcome of eliminating one candidate.
#[derive(PartialEq, Debug, Clone)]
struct Elimination {
    exhausted: Percentage,
    redistributed: Percentage,
    transfers: Vec<(String, Percentage)>,
    next: RoundState,
}

/// Runs the instant-runoff elimination over aggregate shares.
///
/// Every round, the candidate with the lowest share is eliminated. The
/// exhaustion rate of that candidate decides how much of its share leaves
/// the count, the rest is redistributed following its row of the preference
/// model, restricted to the candidates still running. The count stops as soon
/// as a candidate holds strictly more than half of the active ballots, or when
/// a single candidate is left.
///
/// Arguments:
/// * `candidates` the candidates, in the order used for the outputs
/// * `initial_shares` the first-choice shares, summing to 100
/// * `exhaustion_rates` for each candidate, the percentage of its ballots that
/// do not transfer once it is eliminated
/// * `model` the preference model, which must have a row for every candidate
pub fn run_elimination(
    candidates: &[String],
    initial_shares: &SupportVector,
    exhaustion_rates: &SupportVector,
    model: &PreferenceModel,
) -> Result<SimulationResult, SimulationErrors> {
    checks(candidates, initial_shares, exhaustion_rates, model)?;
    info!(
        "Processing {:?} candidates, exhaustion rates: {:?}",
        candidates.len(),
        exhaustion_rates
    );

    let mut tally: Vec<(String, Percentage)> = candidates
        .iter()
        .map(|c| (c.clone(), initial_shares[c]))
        .collect();
    let initial_total: Percentage = tally.iter().map(|(_, p)| *p).sum();
    if (initial_total - 100.0).abs() > RECONCILE_TOLERANCE {
        debug!(
            "run_elimination: rescaling initial shares from {:?} to 100",
            initial_total
        );
        for (_, p) in tally.iter_mut() {
            *p *= 100.0 / initial_total;
        }
    }

    let mut cur_state = RoundState {
        tally,
        total_active: 100.0,
    };
    let mut rounds: Vec<RoundRecord> = Vec::new();

    while cur_state.tally.len() > 1 {
        let round_id = (rounds.len() + 1) as RoundId;
        let active_shares = cur_state.active_shares();
        let previous_tally = rounds.last().map(|r| r.tally.clone());
        let previous_active_shares = rounds.last().map(|r| r.active_shares.clone());
        info!(
            "Round {:?} (active ballots: {:.4}): {:?}",
            round_id, cur_state.total_active, cur_state.tally
        );

        let lowest = find_lowest_candidate(&cur_state.tally);
        debug!("run_elimination: lowest candidate: {:?}", lowest);

        let has_majority = active_shares.iter().any(|(_, s)| *s > MAJORITY);
        if has_majority {
            let winner = find_leader(&cur_state, &active_shares, round_id);
            info!(
                "Round {:?}: {} wins with {:.4}% of the active ballots",
                round_id, winner.name, winner.active_share
            );
            rounds.push(RoundRecord {
                round: round_id,
                tally: cur_state.tally.clone(),
                active_shares,
                previous_tally,
                previous_active_shares,
                eliminated: Some(lowest),
                exhausted: 0.0,
                redistributed: 0.0,
                transfers: Vec::new(),
                total_active: cur_state.total_active,
                is_final: true,
            });
            return Ok(SimulationResult {
                rounds,
                winner: Some(winner),
            });
        }

        let elimination = eliminate(&cur_state, &lowest, exhaustion_rates[&lowest], model);
        info!(
            "Round {:?}: {} eliminated, {:.4} exhausted, {:.4} redistributed",
            round_id, lowest, elimination.exhausted, elimination.redistributed
        );
        rounds.push(RoundRecord {
            round: round_id,
            tally: cur_state.tally.clone(),
            active_shares,
            previous_tally,
            previous_active_shares,
            eliminated: Some(lowest),
            exhausted: elimination.exhausted,
            redistributed: elimination.redistributed,
            transfers: elimination.transfers,
            total_active: cur_state.total_active,
            is_final: false,
        });
        cur_state = elimination.next;
    }

    // A single candidate is left, it is the winner by default.
    let round_id = (rounds.len() + 1) as RoundId;
    let (name, votes) = match cur_state.tally.first() {
        Some((name, votes)) => (name.clone(), *votes),
        // Not reachable: the candidates are checked to be non-empty.
        None => return Err(SimulationErrors::EmptyElection),
    };
    debug!(
        "run_elimination: only {:?} left in round {:?}",
        name, round_id
    );
    rounds.push(RoundRecord {
        round: round_id,
        tally: cur_state.tally.clone(),
        active_shares: vec![(name.clone(), 100.0)],
        previous_tally: rounds.last().map(|r| r.tally.clone()),
        previous_active_shares: rounds.last().map(|r| r.active_shares.clone()),
        eliminated: None,
        exhausted: 0.0,
        redistributed: 0.0,
        transfers: Vec::new(),
        total_active: cur_state.total_active,
        is_final: true,
    });
    info!("Round {:?}: {} wins as the last candidate", round_id, name);
    Ok(SimulationResult {
        rounds,
        winner: Some(Winner {
            name,
            votes,
            active_share: 100.0,
            round: round_id,
            total_active: cur_state.total_active,
        }),
    })
}

// The candidate with the strictly lowest share. Exact ties go to the
// alphabetically first name.
fn find_lowest_candidate(tally: &[(String, Percentage)]) -> String {
    let min_count = tally
        .iter()
        .map(|(_, p)| *p)
        .fold(f64::INFINITY, f64::min);
    let mut all_smallest: Vec<&String> = tally
        .iter()
        .filter_map(|(c, p)| if *p <= min_count { Some(c) } else { None })
        .collect();
    if all_smallest.len() > 1 {
        debug!(
            "find_lowest_candidate: tie between {:?}, using alphabetical order",
            all_smallest
        );
    }
    all_smallest.sort();
    all_smallest
        .first()
        .map(|c| (*c).clone())
        .unwrap_or_default()
}

// The candidate with the highest share of the original ballots. The first
// one in candidate order wins in case of equality.
fn find_leader(
    state: &RoundState,
    active_shares: &[(String, Percentage)],
    round_id: RoundId,
) -> Winner {
    let mut best: Option<(usize, Percentage)> = None;
    for (idx, (_, p)) in state.tally.iter().enumerate() {
        if best.map_or(true, |(_, best_p)| *p > best_p) {
            best = Some((idx, *p));
        }
    }
    let (idx, votes) = best.unwrap_or((0, 0.0));
    Winner {
        name: state.tally[idx].0.clone(),
        votes,
        active_share: active_shares[idx].1,
        round: round_id,
        total_active: state.total_active,
    }
}

fn eliminate(
    state: &RoundState,
    eliminated: &str,
    exhaustion_rate: Percentage,
    model: &PreferenceModel,
) -> Elimination {
    let eliminated_votes = state
        .tally
        .iter()
        .find(|(c, _)| c == eliminated)
        .map(|(_, p)| *p)
        .unwrap_or(0.0);
    let exhausted = eliminated_votes * exhaustion_rate / 100.0;
    let redistributed = eliminated_votes - exhausted;
    let total_active = state.total_active - exhausted;

    let remaining: Vec<(String, Percentage)> = state
        .tally
        .iter()
        .filter(|(c, _)| c != eliminated)
        .cloned()
        .collect();

    // The preferences of the eliminated candidate's voters, restricted to the
    // candidates still running.
    let raw_preferences: Vec<Percentage> = remaining
        .iter()
        .map(|(c, _)| model.preference(eliminated, c).unwrap_or(0.0))
        .collect();
    let total_preference: Percentage = raw_preferences.iter().sum();
    debug!(
        "eliminate: {:?} preferences: {:?}",
        eliminated, raw_preferences
    );

    let transfers: Vec<(String, Percentage)> = remaining
        .iter()
        .zip(raw_preferences.iter())
        .map(|((c, _), pref)| {
            let amount = if total_preference > 0.0 {
                redistributed * pref / total_preference
            } else {
                redistributed / remaining.len() as f64
            };
            (c.clone(), amount)
        })
        .collect();

    let mut next_tally: Vec<(String, Percentage)> = remaining
        .iter()
        .zip(transfers.iter())
        .map(|((c, p), (_, t))| (c.clone(), p + t))
        .collect();

    let computed_total: Percentage = next_tally.iter().map(|(_, p)| *p).sum();
    if (computed_total - total_active).abs() > RECONCILE_TOLERANCE && computed_total > 0.0 {
        debug!(
            "eliminate: reconciling total {:?} with active ballots {:?}",
            computed_total, total_active
        );
        let factor = total_active / computed_total;
        for (_, p) in next_tally.iter_mut() {
            *p *= factor;
        }
    }

    Elimination {
        exhausted,
        redistributed,
        transfers,
        next: RoundState {
            tally: next_tally,
            total_active,
        },
    }
}

// Validates all the inputs before the first round.
fn checks(
    candidates: &[String],
    initial_shares: &SupportVector,
    exhaustion_rates: &SupportVector,
    model: &PreferenceModel,
) -> Result<(), SimulationErrors> {
    check_candidates(candidates)?;
    let known: HashSet<&String> = candidates.iter().collect();

    let mut total: Percentage = 0.0;
    for c in candidates {
        let share = *initial_shares
            .get(c)
            .ok_or_else(|| SimulationErrors::MissingSupport(c.clone()))?;
        if !share.is_finite() || share < 0.0 {
            return Err(SimulationErrors::InvalidSupport {
                candidate: c.clone(),
                value: share,
            });
        }
        total += share;

        let rate = *exhaustion_rates
            .get(c)
            .ok_or_else(|| SimulationErrors::MissingExhaustionRate(c.clone()))?;
        if !(0.0..=100.0).contains(&rate) {
            return Err(SimulationErrors::ExhaustionOutOfRange {
                candidate: c.clone(),
                rate,
            });
        }

        let row = model
            .row(c)
            .ok_or_else(|| SimulationErrors::MissingPreferenceRow(c.clone()))?;
        for (ranked, value) in row {
            if !known.contains(ranked) {
                return Err(SimulationErrors::UnknownCandidate(ranked.clone()));
            }
            if !value.is_finite() || *value < 0.0 {
                return Err(SimulationErrors::InvalidPreference {
                    voter: c.clone(),
                    ranked: ranked.clone(),
                    value: *value,
                });
            }
        }
    }
    if (total - 100.0).abs() > SUPPORT_TOLERANCE {
        return Err(SimulationErrors::SupportNotNormalized(total));
    }

    let mut extra: Vec<&String> = initial_shares
        .keys()
        .filter(|c| !known.contains(*c))
        .collect();
    extra.sort();
    match extra.first() {
        Some(c) => Err(SimulationErrors::UnknownCandidate((*c).clone())),
        None => Ok(()),
    }
}
