//! Feature groupings used to colour per-datapoint loss areas.
//!
//! A grouping is either numeric (one attribute cut into half-open buckets)
//! or categorical (a set of one-hot indicator attributes, each with a display
//! label). Groupings are resolved against a [`FeatureTable`] holding the
//! already-extracted feature columns, aligned by index with the predictions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::id::{DatapointId, GroupId};

/// One indicator attribute of a categorical grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalLevel {
    /// Column holding the one-hot indicator (1 = member).
    pub attribute: String,
    /// Label shown in legends.
    pub label: String,
}

/// How datapoints are assigned to visualization groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureGrouping {
    /// `boundaries = [b0, b1, .., bk]` defines buckets `[b_i, b_{i+1})`.
    Numeric {
        attribute: String,
        boundaries: Vec<f64>,
    },
    /// Exactly one indicator is expected to equal 1 per datapoint.
    Categorical { levels: Vec<CategoricalLevel> },
}

impl FeatureGrouping {
    /// Numeric grouping over one attribute.
    pub fn numeric(attribute: impl Into<String>, boundaries: Vec<f64>) -> Self {
        FeatureGrouping::Numeric {
            attribute: attribute.into(),
            boundaries,
        }
    }

    /// Categorical grouping from `(indicator attribute, display label)` pairs.
    pub fn categorical<A, L>(levels: impl IntoIterator<Item = (A, L)>) -> Self
    where
        A: Into<String>,
        L: Into<String>,
    {
        FeatureGrouping::Categorical {
            levels: levels
                .into_iter()
                .map(|(attribute, label)| CategoricalLevel {
                    attribute: attribute.into(),
                    label: label.into(),
                })
                .collect(),
        }
    }

    /// Check the grouping definition itself (not the data).
    pub fn validate(&self) -> Result<()> {
        match self {
            FeatureGrouping::Numeric {
                attribute,
                boundaries,
            } => {
                if attribute.is_empty() {
                    return Err(Error::InvalidGrouping(
                        "numeric grouping needs an attribute name".to_string(),
                    ));
                }
                if boundaries.len() < 2 {
                    return Err(Error::InvalidGrouping(format!(
                        "numeric grouping '{}' needs at least 2 boundaries, got {}",
                        attribute,
                        boundaries.len()
                    )));
                }
                if boundaries.iter().any(|b| !b.is_finite()) {
                    return Err(Error::InvalidGrouping(format!(
                        "numeric grouping '{}' has a non-finite boundary",
                        attribute
                    )));
                }
                if boundaries.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(Error::InvalidGrouping(format!(
                        "numeric grouping '{}' boundaries must be strictly increasing",
                        attribute
                    )));
                }
            }
            FeatureGrouping::Categorical { levels } => {
                if levels.is_empty() {
                    return Err(Error::InvalidGrouping(
                        "categorical grouping needs at least one level".to_string(),
                    ));
                }
                for (i, level) in levels.iter().enumerate() {
                    if level.attribute.is_empty() {
                        return Err(Error::InvalidGrouping(format!(
                            "categorical level {} has an empty attribute name",
                            i
                        )));
                    }
                    if levels[..i].iter().any(|l| l.attribute == level.attribute) {
                        return Err(Error::InvalidGrouping(format!(
                            "categorical attribute '{}' listed twice",
                            level.attribute
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of groups (buckets or levels).
    pub fn group_count(&self) -> usize {
        match self {
            FeatureGrouping::Numeric { boundaries, .. } => boundaries.len().saturating_sub(1),
            FeatureGrouping::Categorical { levels } => levels.len(),
        }
    }

    /// Legend labels, indexed by [`GroupId`].
    ///
    /// Numeric buckets render as `"{lo}<=...<{hi}"`.
    pub fn labels(&self) -> Vec<String> {
        match self {
            FeatureGrouping::Numeric { boundaries, .. } => boundaries
                .windows(2)
                .map(|w| format!("{}<=...<{}", w[0], w[1]))
                .collect(),
            FeatureGrouping::Categorical { levels } => {
                levels.iter().map(|l| l.label.clone()).collect()
            }
        }
    }

    /// Feature columns the grouping reads.
    pub fn attributes(&self) -> Vec<&str> {
        match self {
            FeatureGrouping::Numeric { attribute, .. } => vec![attribute.as_str()],
            FeatureGrouping::Categorical { levels } => {
                levels.iter().map(|l| l.attribute.as_str()).collect()
            }
        }
    }

    /// Validate the definition and check that every column it reads exists
    /// with exactly `n` rows.
    pub fn check_table(&self, table: &FeatureTable, n: usize) -> Result<()> {
        self.validate()?;
        for attribute in self.attributes() {
            table.column_checked(attribute, n)?;
        }
        Ok(())
    }

    /// Resolve the group of every datapoint in `0..n`.
    ///
    /// Numeric values outside every bucket (or NaN) stay ungrouped (`None`).
    /// A categorical row with zero or several active indicators is an error.
    pub fn resolve_all(&self, table: &FeatureTable, n: usize) -> Result<Vec<Option<GroupId>>> {
        self.check_table(table, n)?;
        (0..n)
            .map(|i| self.resolve(table, DatapointId(i)))
            .collect()
    }

    /// Resolve the group of a single datapoint.
    pub fn resolve(&self, table: &FeatureTable, datapoint: DatapointId) -> Result<Option<GroupId>> {
        let row = datapoint.index();
        match self {
            FeatureGrouping::Numeric {
                attribute,
                boundaries,
            } => {
                let value = table
                    .value(attribute, row)
                    .ok_or_else(|| Error::MissingFeature(attribute.clone()))?;
                Ok(boundaries
                    .windows(2)
                    .position(|w| w[0] <= value && value < w[1])
                    .map(GroupId))
            }
            FeatureGrouping::Categorical { levels } => {
                let mut found = None;
                let mut active = 0;
                for (i, level) in levels.iter().enumerate() {
                    let value = table
                        .value(&level.attribute, row)
                        .ok_or_else(|| Error::MissingFeature(level.attribute.clone()))?;
                    if value == 1.0 {
                        active += 1;
                        if found.is_none() {
                            found = Some(GroupId(i));
                        }
                    }
                }
                if active != 1 {
                    return Err(Error::MalformedGrouping {
                        datapoint: row,
                        active,
                    });
                }
                Ok(found)
            }
        }
    }
}

/// Named numeric feature columns aligned by index with the predictions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureTable {
    columns: BTreeMap<String, Vec<f64>>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a column (builder style).
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(name, values);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.insert(name.into(), values);
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Column lookup that also checks it has exactly `rows` values.
    pub fn column_checked(&self, name: &str, rows: usize) -> Result<&[f64]> {
        let column = self
            .column(name)
            .ok_or_else(|| Error::MissingFeature(name.to_string()))?;
        if column.len() != rows {
            return Err(Error::FeatureLength {
                column: name.to_string(),
                len: column.len(),
                expected: rows,
            });
        }
        Ok(column)
    }

    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.columns.get(name).and_then(|c| c.get(row).copied())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Fail if any column length differs from `rows`.
    pub fn check_rows(&self, rows: usize) -> Result<()> {
        for (name, values) in &self.columns {
            if values.len() != rows {
                return Err(Error::FeatureLength {
                    column: name.clone(),
                    len: values.len(),
                    expected: rows,
                });
            }
        }
        Ok(())
    }
}
