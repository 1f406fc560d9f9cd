//! Cartesian expansion of a filter's parameter grid.

use serde::{Deserialize, Serialize};

use crate::domain::error::{Result, SweepError};
use crate::domain::filter::{FilterSpec, ParamSpec, ParamValue, ParameterAssignment};

/// Fixed parameters plus the discriminant values swept while they stay fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscriminantSweep {
    pub assignment: ParameterAssignment,
    pub discriminant: String,
    pub values: Vec<ParamValue>,
}

/// Every assignment of the filter's parameters, last parameter varying fastest.
///
/// A filter without parameters yields one empty assignment.
pub fn expand(filter: &FilterSpec) -> Vec<ParameterAssignment> {
    let axes: Vec<&ParamSpec> = filter.params.iter().collect();
    product(&axes)
}

/// Same product as [`expand`] with the discriminant axis removed; each
/// assignment carries the discriminant's values in declared order.
pub fn expand_with_discriminant(filter: &FilterSpec) -> Result<Vec<DiscriminantSweep>> {
    let discriminant = filter.discriminant_parameter.as_deref().ok_or_else(|| {
        SweepError::config(format!(
            "filter {} declares no discriminantParameter",
            filter.name
        ))
    })?;
    let swept = filter
        .param(discriminant)
        .ok_or_else(|| SweepError::MissingDiscriminant {
            filter: filter.name.clone(),
            parameter: discriminant.to_string(),
        })?;

    let axes: Vec<&ParamSpec> = filter
        .params
        .iter()
        .filter(|p| p.name != discriminant)
        .collect();

    Ok(product(&axes)
        .into_iter()
        .map(|assignment| DiscriminantSweep {
            assignment,
            discriminant: discriminant.to_string(),
            values: swept.values.clone(),
        })
        .collect())
}

/// Odometer over the axes: the rightmost index increments first.
fn product(axes: &[&ParamSpec]) -> Vec<ParameterAssignment> {
    if axes.iter().any(|axis| axis.values.is_empty()) {
        return Vec::new();
    }

    let total: usize = axes.iter().map(|axis| axis.values.len()).product();
    let mut outputs = Vec::with_capacity(total);
    let mut indices = vec![0usize; axes.len()];

    loop {
        let mut assignment = ParameterAssignment::default();
        for (axis, &idx) in axes.iter().zip(&indices) {
            assignment.push(axis.name.clone(), axis.values[idx].clone());
        }
        outputs.push(assignment);

        let mut pos = axes.len();
        loop {
            if pos == 0 {
                return outputs;
            }
            pos -= 1;
            indices[pos] += 1;
            if indices[pos] < axes[pos].values.len() {
                break;
            }
            indices[pos] = 0;
        }
    }
}
