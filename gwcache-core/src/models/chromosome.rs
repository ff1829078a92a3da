use std::collections::HashMap;
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::HG19_CHROM_SIZES;
use crate::errors::ConfigError;
use crate::utils::read_chrom_sizes;

///
/// A reference chromosome: its name and length in bases.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct Chromosome {
    pub name: String,
    pub length: u64,
}

impl Chromosome {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Chromosome {
            name: name.into(),
            length,
        }
    }
}

impl Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.name, self.length)
    }
}

///
/// Ordered registry of the chromosomes a run works on.
///
/// The order is the enumeration order of training samples, so it is kept
/// exactly as supplied.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ChromosomeCatalog {
    chromosomes: Vec<Chromosome>,
    index: HashMap<String, usize>,
}

impl ChromosomeCatalog {
    ///
    /// Build a catalog from an ordered list of chromosomes.
    ///
    /// Duplicate names and zero lengths are rejected.
    ///
    pub fn new(chromosomes: Vec<Chromosome>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(chromosomes.len());
        for (i, chrom) in chromosomes.iter().enumerate() {
            if chrom.length == 0 {
                return Err(ConfigError::EmptyChromosome(chrom.name.clone()));
            }
            if index.insert(chrom.name.clone(), i).is_some() {
                return Err(ConfigError::DuplicateChromosome(chrom.name.clone()));
            }
        }
        Ok(ChromosomeCatalog { chromosomes, index })
    }

    /// The built-in hg19 catalog (chr1..chr22, chrX).
    pub fn hg19() -> Self {
        let chromosomes = HG19_CHROM_SIZES
            .iter()
            .map(|(name, length)| Chromosome::new(*name, *length))
            .collect::<Vec<_>>();
        let index = chromosomes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        ChromosomeCatalog { chromosomes, index }
    }

    /// Load a catalog from a two-column `chrom.sizes` file, keeping file order.
    pub fn from_chrom_sizes<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::new(read_chrom_sizes(path)?)
    }

    ///
    /// Restrict the catalog to `names`, in the order given.
    ///
    /// # Arguments
    /// - names: chromosome names to keep; each must exist in this catalog
    ///
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, ConfigError> {
        let selected = names
            .iter()
            .map(|name| {
                self.get(name.as_ref())
                    .cloned()
                    .ok_or_else(|| ConfigError::UnsupportedChromosome(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(selected)
    }

    pub fn get(&self, name: &str) -> Option<&Chromosome> {
        self.index.get(name).map(|&i| &self.chromosomes[i])
    }

    pub fn length(&self, name: &str) -> Option<u64> {
        self.get(name).map(|c| c.length)
    }

    /// Position of `name` in enumeration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chromosome> {
        self.chromosomes.iter()
    }

    pub fn as_slice(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    /// The shortest chromosome, which bounds every fixed-width window.
    pub fn shortest(&self) -> Option<&Chromosome> {
        self.chromosomes.iter().min_by_key(|c| c.length)
    }
}

impl<'a> IntoIterator for &'a ChromosomeCatalog {
    type Item = &'a Chromosome;
    type IntoIter = std::slice::Iter<'a, Chromosome>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
