use serde::Serialize;

use crate::error::SadError;

/// Community totals a species-abundance model is fitted to.
///
/// A problem is only ever built through [`AbundanceProblem::new`] or
/// [`AbundanceProblem::from_abundances`], so a value of this type always
/// satisfies `N > 0`, `S > 1` and `S < N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AbundanceProblem {
    /// Total number of species (S)
    species: u64,
    /// Total number of individuals (N)
    individuals: u64,
}

impl AbundanceProblem {
    /// Validate (S, N) and build a problem.
    ///
    /// # Examples
    ///
    /// ```
    /// use macroeco_sad::AbundanceProblem;
    ///
    /// let problem = AbundanceProblem::new(10, 1000).unwrap();
    /// assert_eq!(problem.species(), 10);
    /// assert!(AbundanceProblem::new(1000, 10).is_err());
    /// ```
    pub fn new(species: u64, individuals: u64) -> Result<Self, SadError> {
        if individuals == 0 {
            return Err(SadError::InvalidParameters(
                "N must be greater than 0".to_string(),
            ));
        }
        if species <= 1 {
            return Err(SadError::InvalidParameters(format!(
                "S must be greater than 1 (got S = {species})"
            )));
        }
        if species >= individuals {
            return Err(SadError::InvalidParameters(format!(
                "S must be less than N (got S = {species}, N = {individuals})"
            )));
        }
        Ok(Self {
            species,
            individuals,
        })
    }

    /// Derive (S, N) from an observed abundance vector.
    pub fn from_abundances(abundances: &[u64]) -> Result<Self, SadError> {
        if abundances.iter().any(|&a| a == 0) {
            return Err(SadError::InvalidParameters(
                "abundances must all be positive".to_string(),
            ));
        }
        Self::new(abundances.len() as u64, abundances.iter().sum())
    }

    pub fn species(&self) -> u64 {
        self.species
    }

    pub fn individuals(&self) -> u64 {
        self.individuals
    }

    /// S as a float, for use in constraint equations.
    pub fn s(&self) -> f64 {
        self.species as f64
    }

    /// N as a float, for use in constraint equations.
    pub fn n(&self) -> f64 {
        self.individuals as f64
    }
}

impl std::fmt::Display for AbundanceProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S = {}, N = {}", self.species, self.individuals)
    }
}
