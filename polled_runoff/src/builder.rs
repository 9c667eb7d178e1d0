use log::debug;

pub use crate::config::*;
use crate::{build_preference_model, run_elimination};

const NORMALIZE_TOLERANCE: Percentage = 0.01;

/// A builder for assembling a scenario from polling numbers.
///
/// It is the simplest way to run a full simulation: the preference model is
/// derived from the candidates and the modifiers when calling `run`.
///
/// ```
/// use polled_runoff::builder::Builder;
/// use polled_runoff::{Ideology, SimulationErrors};
///
/// let mut builder = Builder::new();
/// builder.add_candidate("Anna", 55.0, 10.0, Ideology::Progressive)?;
/// builder.add_candidate("Bob", 45.0, 20.0, Ideology::Moderate)?;
/// builder.fill_missing_modifiers(0.0);
///
/// let result = builder.run()?;
/// assert_eq!(result.winner.map(|w| w.name), Some("Anna".to_string()));
///
/// # Ok::<(), SimulationErrors>(())
/// ```
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _candidates: Vec<String>,
    pub(crate) _support: SupportVector,
    pub(crate) _exhaustion: SupportVector,
    pub(crate) _ideologies: IdeologyAssignment,
    pub(crate) _modifiers: ModifierTable,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Adds a candidate with its first-choice support, exhaustion rate and ideology.
    pub fn add_candidate(
        &mut self,
        name: &str,
        support: Percentage,
        exhaustion_rate: Percentage,
        ideology: Ideology,
    ) -> Result<(), SimulationErrors> {
        if self._candidates.iter().any(|c| c == name) {
            return Err(SimulationErrors::DuplicateCandidate(name.to_string()));
        }
        self._candidates.push(name.to_string());
        self._support.insert(name.to_string(), support);
        self._exhaustion.insert(name.to_string(), exhaustion_rate);
        self._ideologies.insert(name.to_string(), ideology);
        Ok(())
    }

    /// Overwrites the support of a candidate, without touching the others.
    pub fn set_support(&mut self, name: &str, support: Percentage) -> Result<(), SimulationErrors> {
        self.check_known(name)?;
        self._support.insert(name.to_string(), support);
        Ok(())
    }

    pub fn set_exhaustion_rate(
        &mut self,
        name: &str,
        exhaustion_rate: Percentage,
    ) -> Result<(), SimulationErrors> {
        self.check_known(name)?;
        self._exhaustion.insert(name.to_string(), exhaustion_rate);
        Ok(())
    }

    pub fn set_modifier(&mut self, ideology: Ideology, candidate: &str, modifier: f64) {
        self._modifiers
            .entry(ideology)
            .or_default()
            .insert(candidate.to_string(), modifier);
    }

    /// Sets the given modifier for every (ideology, candidate) pair that has none yet.
    pub fn fill_missing_modifiers(&mut self, modifier: f64) {
        for ideology in Ideology::ALL {
            let row = self._modifiers.entry(ideology).or_default();
            for c in self._candidates.iter() {
                row.entry(c.clone()).or_insert(modifier);
            }
        }
    }

    /// Sets the support of one candidate and rescales the others so that the
    /// total stays at 100.
    pub fn adjust_support(&mut self, name: &str, support: Percentage) -> Result<(), SimulationErrors> {
        self._support = rebalance_support(&self._support, &self._candidates, name, support)?;
        Ok(())
    }

    /// Rescales the support to sum to 100.
    pub fn normalize_support(&mut self) {
        self._support = normalize_support(&self._support);
    }

    pub fn candidates(&self) -> &[String] {
        &self._candidates
    }

    pub fn support(&self) -> &SupportVector {
        &self._support
    }

    pub fn exhaustion_rates(&self) -> &SupportVector {
        &self._exhaustion
    }

    pub fn preference_model(&self) -> Result<PreferenceModel, SimulationErrors> {
        build_preference_model(
            &self._candidates,
            &self._support,
            &self._ideologies,
            &self._modifiers,
        )
    }

    /// Builds the preference model and runs the elimination.
    pub fn run(&self) -> Result<SimulationResult, SimulationErrors> {
        let model = self.preference_model()?;
        run_elimination(&self._candidates, &self._support, &self._exhaustion, &model)
    }

    fn check_known(&self, name: &str) -> Result<(), SimulationErrors> {
        if self._candidates.iter().any(|c| c == name) {
            Ok(())
        } else {
            Err(SimulationErrors::UnknownCandidate(name.to_string()))
        }
    }
}

/// Rescales a support vector so that it sums to 100.
///
/// Vectors already within 0.01 of 100, or summing to zero, are returned as is.
pub fn normalize_support(support: &SupportVector) -> SupportVector {
    let total: Percentage = support.values().sum();
    if total > 0.0 && (total - 100.0).abs() > NORMALIZE_TOLERANCE {
        debug!("normalize_support: rescaling from {:?}", total);
        support
            .iter()
            .map(|(c, p)| (c.clone(), p / total * 100.0))
            .collect()
    } else {
        support.clone()
    }
}

/// Sets the support of `candidate` to `value` and proportionally rescales
/// every other candidate to keep the total at 100.
///
/// When the other candidates have no support at all, the difference is split
/// evenly between them, floored at zero.
pub fn rebalance_support(
    support: &SupportVector,
    candidates: &[String],
    candidate: &str,
    value: Percentage,
) -> Result<SupportVector, SimulationErrors> {
    if !candidates.iter().any(|c| c == candidate) {
        return Err(SimulationErrors::UnknownCandidate(candidate.to_string()));
    }
    if !value.is_finite() || value < 0.0 {
        return Err(SimulationErrors::InvalidSupport {
            candidate: candidate.to_string(),
            value,
        });
    }
    let old_value = support.get(candidate).cloned().unwrap_or(0.0);
    let difference = value - old_value;

    let mut res = support.clone();
    res.insert(candidate.to_string(), value);
    if difference == 0.0 {
        return Ok(res);
    }

    let others: Vec<&String> = candidates.iter().filter(|c| *c != candidate).collect();
    if others.is_empty() {
        return Ok(res);
    }
    let other_total: Percentage = others
        .iter()
        .map(|c| support.get(*c).cloned().unwrap_or(0.0))
        .sum();

    if other_total == 0.0 {
        let equal_share = -difference / others.len() as f64;
        for c in others {
            let prev = support.get(c).cloned().unwrap_or(0.0);
            res.insert(c.clone(), (prev + equal_share).max(0.0));
        }
    } else {
        let scaling = (other_total - difference) / other_total;
        for c in others {
            let prev = support.get(c).cloned().unwrap_or(0.0);
            res.insert(c.clone(), (prev * scaling).max(0.0));
        }
    }

    let new_total: Percentage = res.values().sum();
    if new_total > 0.0 && (new_total - 100.0).abs() > NORMALIZE_TOLERANCE {
        debug!(
            "rebalance_support: {:?} set to {:?}, rescaling from {:?}",
            candidate, value, new_total
        );
        for p in res.values_mut() {
            *p = *p / new_total * 100.0;
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn support(v: &[(&str, f64)]) -> SupportVector {
        v.iter().map(|(c, p)| (c.to_string(), *p)).collect()
    }

    fn total(s: &SupportVector) -> f64 {
        s.values().sum()
    }

    #[test]
    fn rebalance_scales_the_others() {
        let cands = names(&["A", "B", "C"]);
        let s = support(&[("A", 50.0), ("B", 30.0), ("C", 20.0)]);
        let res = rebalance_support(&s, &cands, "A", 60.0).unwrap();
        assert_eq!(res["A"], 60.0);
        assert!((res["B"] - 24.0).abs() < 1e-9);
        assert!((res["C"] - 16.0).abs() < 1e-9);
        assert!((total(&res) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rebalance_over_100_rescales_everything() {
        let cands = names(&["A", "B"]);
        let s = support(&[("A", 50.0), ("B", 50.0)]);
        // B would become negative, floored at 0, then A is scaled back to 100.
        let res = rebalance_support(&s, &cands, "A", 120.0).unwrap();
        assert_eq!(res["B"], 0.0);
        assert!((res["A"] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rebalance_with_empty_others() {
        let cands = names(&["A", "B", "C"]);
        let s = support(&[("A", 100.0), ("B", 0.0), ("C", 0.0)]);
        let res = rebalance_support(&s, &cands, "A", 80.0).unwrap();
        assert!((res["B"] - 10.0).abs() < 1e-9);
        assert!((res["C"] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn rebalance_over_100_with_empty_others() {
        let cands = names(&["A", "B"]);
        let s = support(&[("A", 100.0), ("B", 0.0)]);
        let res = rebalance_support(&s, &cands, "A", 120.0).unwrap();
        assert!((res["A"] - 100.0).abs() < 1e-9);
        assert_eq!(res["B"], 0.0);

        let mut builder = Builder::new();
        builder
            .add_candidate("A", 100.0, 0.0, Ideology::Moderate)
            .unwrap();
        builder.add_candidate("B", 0.0, 0.0, Ideology::Moderate).unwrap();
        builder.fill_missing_modifiers(0.0);
        builder.adjust_support("A", 120.0).unwrap();
        assert!((total(builder.support()) - 100.0).abs() < 1e-9);
        let res = builder.run().unwrap();
        assert_eq!(res.winner.map(|w| w.name), Some("A".to_string()));
    }

    #[test]
    fn rebalance_rejects_bad_inputs() {
        let cands = names(&["A", "B"]);
        let s = support(&[("A", 50.0), ("B", 50.0)]);
        assert_eq!(
            rebalance_support(&s, &cands, "Z", 10.0),
            Err(SimulationErrors::UnknownCandidate("Z".to_string()))
        );
        assert!(matches!(
            rebalance_support(&s, &cands, "A", -3.0),
            Err(SimulationErrors::InvalidSupport { .. })
        ));
    }

    #[test]
    fn normalize() {
        let s = support(&[("A", 48.54), ("B", 20.51), ("C", 8.92)]);
        let res = normalize_support(&s);
        assert!((total(&res) - 100.0).abs() < 1e-9);
        assert!(res["A"] > res["B"]);

        let close = support(&[("A", 60.005), ("B", 40.0)]);
        assert_eq!(normalize_support(&close), close);
    }

    #[test]
    fn builder_runs_a_scenario() {
        let mut builder = Builder::new();
        builder
            .add_candidate("Cora", 40.0, 10.0, Ideology::Progressive)
            .unwrap();
        builder
            .add_candidate("Dev", 35.0, 10.0, Ideology::Progressive)
            .unwrap();
        builder
            .add_candidate("Ezra", 25.0, 0.0, Ideology::Conservative)
            .unwrap();
        builder.set_modifier(Ideology::Conservative, "Dev", -1.0);
        builder.fill_missing_modifiers(0.0);
        assert_eq!(
            builder.add_candidate("Dev", 1.0, 1.0, Ideology::Moderate),
            Err(SimulationErrors::DuplicateCandidate("Dev".to_string()))
        );

        let model = builder.preference_model().unwrap();
        assert_eq!(model.preference("Ezra", "Dev"), Some(0.0));

        // Ezra's voters all go to Cora: 65 against 35.
        let res = builder.run().unwrap();
        let w = res.winner.unwrap();
        assert_eq!(w.name, "Cora");
        assert!((w.votes - 65.0).abs() < 1e-9);

        builder.adjust_support("Ezra", 45.0).unwrap();
        assert!((total(builder.support()) - 100.0).abs() < 1e-9);
        assert_eq!(
            builder.set_support("Nobody", 1.0),
            Err(SimulationErrors::UnknownCandidate("Nobody".to_string()))
        );
    }
}
