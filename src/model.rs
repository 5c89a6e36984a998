use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance added before flooring expected genotype counts, so that products such as
/// `1000 * 0.6 * 0.6` do not lose an individual to representation error.
const FLOOR_EPS: f64 = 1e-9;

/// Genotype at the single modeled locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genotype {
    HomozygousDominant,
    Heterozygous,
    HomozygousRecessive,
}

impl Genotype {
    pub const ALL: [Genotype; 3] = [
        Genotype::HomozygousDominant,
        Genotype::Heterozygous,
        Genotype::HomozygousRecessive,
    ];
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Genotype::HomozygousDominant => "AA",
            Genotype::Heterozygous => "Aa",
            Genotype::HomozygousRecessive => "aa",
        };
        f.write_str(label)
    }
}

/// Number of individuals of each genotype.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Population {
    pub dom: u64,
    pub het: u64,
    pub rec: u64,
}

impl Population {
    pub fn new(dom: u64, het: u64, rec: u64) -> Self {
        Self { dom, het, rec }
    }

    /// Split `total` individuals into Hardy-Weinberg proportions for allele frequency `p`.
    ///
    /// Homozygote counts are floored and the remainder goes to the heterozygotes,
    /// so the three counts always sum to `total`.
    pub fn hardy_weinberg(total: u64, p: f64) -> Self {
        let q = 1.0 - p;
        let n = total as f64;
        let dom = ((n * p * p + FLOOR_EPS).floor() as u64).min(total);
        let rec = ((n * q * q + FLOOR_EPS).floor() as u64).min(total - dom);
        let het = total - dom - rec;
        Self { dom, het, rec }
    }

    pub fn total(&self) -> u64 {
        self.dom + self.het + self.rec
    }

    pub fn is_extinct(&self) -> bool {
        self.total() == 0
    }

    pub fn count(&self, genotype: Genotype) -> u64 {
        match genotype {
            Genotype::HomozygousDominant => self.dom,
            Genotype::Heterozygous => self.het,
            Genotype::HomozygousRecessive => self.rec,
        }
    }

    pub fn count_mut(&mut self, genotype: Genotype) -> &mut u64 {
        match genotype {
            Genotype::HomozygousDominant => &mut self.dom,
            Genotype::Heterozygous => &mut self.het,
            Genotype::HomozygousRecessive => &mut self.rec,
        }
    }

    /// Remove up to `n` individuals of `genotype`.
    ///
    /// Returns the shortfall, i.e. how many individuals could not be removed because
    /// the count would otherwise have gone negative. A non-zero shortfall means the
    /// caller computed an inconsistent loss.
    pub fn remove(&mut self, genotype: Genotype, n: u64) -> u64 {
        let count = self.count_mut(genotype);
        let shortfall = n.saturating_sub(*count);
        *count = count.saturating_sub(n);
        shortfall
    }

    /// Allele frequencies, or `None` for an extinct population.
    pub fn allele_freqs(&self) -> Option<AlleleFreqs> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let p = (2 * self.dom + self.het) as f64 / (2 * total) as f64;
        Some(AlleleFreqs::from_p(p))
    }

    /// Genotype frequencies, or `None` for an extinct population.
    pub fn genotype_freqs(&self) -> Option<GenotypeFreqs> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let n = total as f64;
        Some(GenotypeFreqs {
            dom: self.dom as f64 / n,
            het: self.het as f64 / n,
            rec: self.rec as f64 / n,
        })
    }
}

/// Dominant (`p`) and recessive (`q`) allele frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlleleFreqs {
    pub p: f64,
    pub q: f64,
}

impl AlleleFreqs {
    pub fn from_p(p: f64) -> Self {
        let p = p.clamp(0.0, 1.0);
        Self { p, q: 1.0 - p }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenotypeFreqs {
    pub dom: f64,
    pub het: f64,
    pub rec: f64,
}

/// Counts together with the quantities derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationState {
    pub counts: Population,
    pub allele_freqs: Option<AlleleFreqs>,
    pub genotype_freqs: Option<GenotypeFreqs>,
}

impl From<Population> for PopulationState {
    fn from(counts: Population) -> Self {
        Self {
            counts,
            allele_freqs: counts.allele_freqs(),
            genotype_freqs: counts.genotype_freqs(),
        }
    }
}

/// Environmental parameters shared by the whole population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Yearly mean temperature (°C).
    pub temperature_mean: f64,
    /// Seasonal temperature amplitude (°C).
    pub temperature_amplitude: f64,
    /// Food abundance, kept in `[FOOD_MIN, FOOD_MAX]`.
    pub food_abundance: f64,
    pub ph: f64,
    /// Pollution level, kept in `[0, 1]`.
    pub pollution: f64,
    /// Predator density, kept in `[0, 1]`.
    pub predator_density: f64,
}

impl Environment {
    pub const FOOD_MIN: f64 = 0.2;
    pub const FOOD_MAX: f64 = 2.0;

    pub fn set_food(&mut self, food: f64) {
        self.food_abundance = food.clamp(Self::FOOD_MIN, Self::FOOD_MAX);
    }

    pub fn set_pollution(&mut self, pollution: f64) {
        self.pollution = pollution.clamp(0.0, 1.0);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            temperature_mean: 15.0,
            temperature_amplitude: 8.0,
            food_abundance: 1.0,
            ph: 7.0,
            pollution: 0.1,
            predator_density: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn index(self) -> usize {
        match self {
            Season::Spring => 0,
            Season::Summer => 1,
            Season::Autumn => 2,
            Season::Winter => 3,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }

    pub fn is_breeding(self) -> bool {
        matches!(self, Season::Spring | Season::Summer)
    }

    /// Target food multiplier the food abundance relaxes toward.
    pub fn food_target(self) -> f64 {
        match self {
            Season::Spring => 1.3,
            Season::Summer => 1.5,
            Season::Autumn => 0.9,
            Season::Winter => 0.5,
        }
    }

    pub fn reproduction_multiplier(self) -> f64 {
        match self {
            Season::Spring => 1.6,
            Season::Summer => 1.3,
            Season::Autumn | Season::Winter => 1.0,
        }
    }
}

/// Season and completed-year counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    season: Season,
    year: u32,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            season: Season::Spring,
            year: 0,
        }
    }

    pub fn season(&self) -> Season {
        self.season
    }

    /// Number of completed years.
    pub fn year(&self) -> u32 {
        self.year
    }

    /// One-based index of the year currently being simulated.
    pub fn year_in_progress(&self) -> u32 {
        self.year + 1
    }

    /// Move to the next season. Returns `true` if this completed a year.
    pub fn advance(&mut self) -> bool {
        self.season = self.season.next();
        if self.season == Season::Spring {
            self.year += 1;
            return true;
        }
        false
    }

    /// Close the current year early, e.g. after an extinction mid-year.
    pub fn close_year(&mut self) {
        self.season = Season::Spring;
        self.year += 1;
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
