use log::debug;
use std::collections::HashSet;

use crate::config::*;

/// Derives the preference model from the first-choice support and the
/// ideological alignment of the candidates.
///
/// For the voters of each candidate, the preference for another candidate
/// starts from that candidate's share of the support of everyone except the
/// voter-candidate, then gets scaled by `1 + modifier` where the modifier comes
/// from the voter-candidate's ideology. Results are floored at zero and each
/// row is normalized to sum to 100. A row stays all zero when the other
/// candidates have no support.
///
/// Arguments:
/// * `candidates` the candidates, in the order used for every row
/// * `support` the first-choice support of each candidate
/// * `ideologies` the ideology of each candidate
/// * `modifiers` the modifier table, which must be complete
pub fn build_preference_model(
    candidates: &[String],
    support: &SupportVector,
    ideologies: &IdeologyAssignment,
    modifiers: &ModifierTable,
) -> Result<PreferenceModel, SimulationErrors> {
    check_candidates(candidates)?;
    for c in candidates {
        match support.get(c) {
            None => return Err(SimulationErrors::MissingSupport(c.clone())),
            Some(v) if !v.is_finite() || *v < 0.0 => {
                return Err(SimulationErrors::InvalidSupport {
                    candidate: c.clone(),
                    value: *v,
                })
            }
            Some(_) => {}
        }
        if !ideologies.contains_key(c) {
            return Err(SimulationErrors::MissingIdeology(c.clone()));
        }
    }
    for ideology in Ideology::ALL {
        let row = modifiers.get(&ideology);
        for c in candidates {
            if row.and_then(|r| r.get(c)).is_none() {
                return Err(SimulationErrors::MissingModifier {
                    ideology,
                    candidate: c.clone(),
                });
            }
        }
    }

    let mut rows: Vec<(String, Vec<(String, Percentage)>)> = Vec::new();
    for voter in candidates {
        // Checked above.
        let ideology = ideologies[voter];
        let row_modifiers = &modifiers[&ideology];

        let others: Vec<&String> = candidates.iter().filter(|c| *c != voter).collect();
        let others_total: Percentage = others.iter().map(|c| support[*c]).sum();

        let mut row: Vec<(String, Percentage)> = others
            .iter()
            .map(|ranked| {
                let base = if others_total > 0.0 {
                    support[*ranked] / others_total * 100.0
                } else {
                    0.0
                };
                let adjusted = base * (1.0 + row_modifiers[*ranked]);
                ((*ranked).clone(), adjusted.max(0.0))
            })
            .collect();

        let total: Percentage = row.iter().map(|(_, p)| *p).sum();
        if total > 0.0 {
            for (_, p) in row.iter_mut() {
                *p = *p / total * 100.0;
            }
        } else {
            debug!(
                "build_preference_model: all-zero preferences for voters of {:?}",
                voter
            );
        }
        debug!("build_preference_model: {:?} ({}): {:?}", voter, ideology, row);
        rows.push((voter.clone(), row));
    }
    Ok(PreferenceModel::from_rows(&rows))
}

pub(crate) fn check_candidates(candidates: &[String]) -> Result<(), SimulationErrors> {
    if candidates.is_empty() {
        return Err(SimulationErrors::EmptyElection);
    }
    let mut seen: HashSet<&String> = HashSet::new();
    for c in candidates {
        if !seen.insert(c) {
            return Err(SimulationErrors::DuplicateCandidate(c.clone()));
        }
    }
    Ok(())
}
