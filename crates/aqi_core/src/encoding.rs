//! City label encoder
//!
//! Cities are coded by their position in the sorted list of distinct names
//! seen at training time. The mapping is data-dependent, so serving always
//! reads it from the bundle instead of recomputing it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::AssemblyError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CityEncoder {
    classes: Vec<String>,
}

impl CityEncoder {
    /// Fit the encoder over any collection of city names
    pub fn fit<I, S>(cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes = cities
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self { classes }
    }

    /// Known cities in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn contains(&self, city: &str) -> bool {
        self.code_of(city).is_some()
    }

    pub fn code_of(&self, city: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(city))
            .ok()
    }

    /// Encode a city, rejecting names the model never saw
    pub fn transform(&self, city: &str) -> Result<usize, AssemblyError> {
        self.code_of(city).ok_or_else(|| AssemblyError::UnknownCity {
            city: city.to_string(),
        })
    }

    /// Classes must be strictly increasing for codes to be a bijection
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("city encoder has no classes".to_string());
        }
        if let Some(pair) = self.classes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(format!(
                "city encoder classes are not strictly sorted near `{}`",
                pair[1]
            ));
        }
        Ok(())
    }
}
