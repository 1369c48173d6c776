//! Aggregation over completed cases: grouping by one sweep axis and
//! per-axis extremes of a chosen signal.

use hfpi_io::{DirectionalRow, Extremes, ResultStore};
use hfpi_model::{Axes, CaseParameters, CaseResult, Floor, ForcesData, ModelError, Parameter};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A completed case read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCase {
    pub parameters: CaseParameters,
    pub result: CaseResult,
}

/// Loads every case of `cases` that has a published result, in plan order.
/// Missing results are skipped; unreadable ones are errors.
pub fn load_completed(store: &ResultStore, cases: &[CaseParameters]) -> Result<Vec<LoadedCase>> {
    let completed = store.completed_keys()?;
    cases
        .iter()
        .filter(|p| completed.contains(&p.key()))
        .map(|p| -> Result<LoadedCase> {
            Ok(LoadedCase {
                parameters: *p,
                result: store.load(p)?,
            })
        })
        .collect()
}

/// Cases sharing one value of the grouping parameter; the other two axes
/// vary freely inside the group.
#[derive(Debug, Clone)]
pub struct CaseGroup<'a> {
    pub value: f64,
    pub cases: Vec<&'a LoadedCase>,
}

/// Groups in ascending parameter value; case order within a group is kept.
pub fn group_by(cases: &[LoadedCase], parameter: Parameter) -> Vec<CaseGroup<'_>> {
    let mut groups: Vec<CaseGroup<'_>> = Vec::new();
    for case in cases {
        let value = case.parameters.value(parameter);
        match groups.iter_mut().find(|g| g.value == value) {
            Some(group) => group.cases.push(case),
            None => groups.push(CaseGroup {
                value,
                cases: vec![case],
            }),
        }
    }
    groups.sort_by(|a, b| a.value.total_cmp(&b.value));
    groups
}

/// Signal reduced by [`extremes`] and [`applied_extremes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Floor displacements, every floor and sample
    Displacement,
    /// Static-equivalent base shear and torsion
    StaticEquivalentForce,
    /// Static-equivalent overturning moments and torsion
    StaticEquivalentMoment,
    /// Applied wind base shear and torsion
    AppliedForce,
    /// Applied wind overturning moments and torsion
    AppliedMoment,
}

impl Signal {
    /// Whether the signal is read from the wind load rather than the response.
    pub fn is_applied(self) -> bool {
        matches!(self, Signal::AppliedForce | Signal::AppliedMoment)
    }

    /// Series of a response signal; applied signals are not stored in a
    /// case result and are rejected.
    pub fn series(self, result: &CaseResult, floors: &[Floor]) -> Result<Axes<DVector<f64>>> {
        Ok(match self {
            Signal::Displacement => result
                .displacement
                .view()
                .map(|m| DVector::from_column_slice(m.as_slice())),
            Signal::StaticEquivalentForce => result.base_shear(),
            Signal::StaticEquivalentMoment => result.base_moment(floors)?,
            Signal::AppliedForce | Signal::AppliedMoment => {
                return Err(ModelError::InvalidInput(format!(
                    "{self:?} is not part of a case result, use applied_extremes"
                ))
                .into());
            }
        })
    }

    /// Series of an applied signal from physical forces.
    pub fn load_series(self, forces: &ForcesData, floors: &[Floor]) -> Result<Axes<DVector<f64>>> {
        match self {
            Signal::AppliedForce => Ok(forces.base_forces()),
            Signal::AppliedMoment => Ok(forces.base_moments(floors)?),
            _ => Err(ModelError::InvalidInput(format!("{self:?} is not an applied signal")).into()),
        }
    }
}

/// Per-axis min, mean and max of a response `signal` pooled over `cases`;
/// `None` when there are no samples.
pub fn extremes(cases: &[&LoadedCase], signal: Signal, floors: &[Floor]) -> Result<Option<Axes<Extremes>>> {
    let series = cases
        .iter()
        .map(|c| signal.series(&c.result, floors))
        .collect::<Result<Vec<_>>>()?;
    Ok(pooled_extremes(&series))
}

/// Like [`extremes`], but also accepts applied signals. `static_forces`
/// supplies the physical wind forces of a case. They depend on direction
/// and recurrence period only, so each such pair is counted once.
pub fn applied_extremes(
    cases: &[&LoadedCase],
    signal: Signal,
    floors: &[Floor],
    static_forces: impl Fn(&CaseParameters) -> Result<ForcesData>,
) -> Result<Option<Axes<Extremes>>> {
    if !signal.is_applied() {
        return extremes(cases, signal, floors);
    }
    let mut seen: Vec<(f64, f64)> = Vec::new();
    let mut series = Vec::new();
    for case in cases {
        let load = (case.parameters.direction, case.parameters.recurrence_period);
        if seen.contains(&load) {
            continue;
        }
        seen.push(load);
        series.push(signal.load_series(&static_forces(&case.parameters)?, floors)?);
    }
    Ok(pooled_extremes(&series))
}

/// Pools several series, sample-weighted.
pub fn pooled_extremes(series: &[Axes<DVector<f64>>]) -> Option<Axes<Extremes>> {
    let mut total: Option<(Axes<Extremes>, usize)> = None;
    for s in series {
        let n = s.x.len();
        let Some(current) = axes_extremes(s) else {
            continue;
        };
        total = Some(match total {
            None => (current, n),
            Some((acc, count)) => (
                Axes {
                    x: acc.x.merge(count, current.x, n),
                    y: acc.y.merge(count, current.y, n),
                    z: acc.z.merge(count, current.z, n),
                },
                count + n,
            ),
        });
    }
    total.map(|(e, _)| e)
}

fn axes_extremes(series: &Axes<DVector<f64>>) -> Option<Axes<Extremes>> {
    Some(Axes {
        x: Extremes::of(series.x.iter().copied())?,
        y: Extremes::of(series.y.iter().copied())?,
        z: Extremes::of(series.z.iter().copied())?,
    })
}

/// One report row per direction.
///
/// The static columns come from the applied wind forces, which depend on
/// direction and recurrence period only; `static_forces` supplies them in
/// physical units and each `(direction, period)` pair is counted once.
pub fn directional_table(
    cases: &[LoadedCase],
    floors: &[Floor],
    static_forces: impl Fn(&CaseParameters) -> Result<ForcesData>,
) -> Result<Vec<DirectionalRow>> {
    group_by(cases, Parameter::Direction)
        .into_iter()
        .map(|group| -> Result<DirectionalRow> {
            let row = |signal: Signal| -> Result<Axes<Extremes>> {
                applied_extremes(&group.cases, signal, floors, &static_forces)?.ok_or_else(|| {
                    ModelError::InvalidInput(format!(
                        "no {signal:?} samples for direction {}",
                        group.value
                    ))
                    .into()
                })
            };
            Ok(DirectionalRow {
                direction: group.value,
                static_force: row(Signal::AppliedForce)?,
                static_moment: row(Signal::AppliedMoment)?,
                equivalent_force: row(Signal::StaticEquivalentForce)?,
                equivalent_moment: row(Signal::StaticEquivalentMoment)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfpi_model::{DimensionalParameters, ForceTable};
    use nalgebra::DMatrix;
    use std::cell::Cell;

    fn case(direction: f64, xi: f64, fill: &[f64]) -> LoadedCase {
        let m = DMatrix::from_row_slice(fill.len(), 1, fill);
        let axes = Axes {
            x: m.clone(),
            y: m.clone() * 2.0,
            z: m,
        };
        LoadedCase {
            parameters: CaseParameters::new(direction, xi, 50.0),
            result: CaseResult::new(axes.clone(), axes).unwrap(),
        }
    }

    fn floor() -> Vec<Floor> {
        vec![Floor {
            height: 10.0,
            center_of_rotation: (0.0, 0.0),
            mass: 1.0,
            moment_of_inertia: 1.0,
            radius_of_gyration: 1.0,
        }]
    }

    #[test]
    fn groups_by_any_axis_in_ascending_order() {
        let cases = vec![
            case(90.0, 0.02, &[1.0]),
            case(0.0, 0.02, &[1.0]),
            case(90.0, 0.01, &[1.0]),
        ];
        let by_direction = group_by(&cases, Parameter::Direction);
        assert_eq!(by_direction.len(), 2);
        assert_eq!(by_direction[0].value, 0.0);
        assert_eq!(by_direction[1].cases.len(), 2);
        // the other axes stay intact inside a group
        assert_eq!(by_direction[1].cases[1].parameters.damping_ratio, 0.01);

        let by_xi = group_by(&cases, Parameter::DampingRatio);
        assert_eq!(by_xi.len(), 2);
        assert_eq!(by_xi[0].value, 0.01);
        assert_eq!(by_xi[1].cases.len(), 2);
    }

    #[test]
    fn pooled_extremes_weight_by_samples() {
        let a = case(0.0, 0.02, &[1.0, 3.0]);
        let b = case(0.0, 0.01, &[-4.0, 0.0, 6.0, 2.0]);
        let e = extremes(&[&a, &b], Signal::StaticEquivalentForce, &floor())
            .unwrap()
            .unwrap();
        assert_eq!(e.x.min, -4.0);
        assert_eq!(e.x.max, 6.0);
        assert_eq!(e.x.mean, 8.0 / 6.0);
        assert_eq!(e.y.max, 12.0);
    }

    #[test]
    fn moment_signal_uses_heights() {
        let a = case(0.0, 0.02, &[1.0, 3.0]);
        let e = extremes(&[&a], Signal::StaticEquivalentMoment, &floor())
            .unwrap()
            .unwrap();
        // x = −Fy·Z with Fy = 2·value
        assert_eq!(e.x.min, -60.0);
        assert_eq!(e.y.max, 30.0);
    }

    /// Physical forces with Fx = [v, −v] on the single floor.
    fn applied(v: f64) -> ForcesData {
        let dims = DimensionalParameters::new(1.0, 1.0, 1.0)
            .unwrap()
            .with_air_density(2.0)
            .unwrap();
        let fx = ForceTable::new(vec![0], DMatrix::from_row_slice(2, 1, &[v, -v])).unwrap();
        let none = || ForceTable::new(vec![], DMatrix::zeros(2, 0)).unwrap();
        ForcesData::new(vec![0.0, 1.0], fx, none(), none())
            .unwrap()
            .scale(&dims)
            .unwrap()
    }

    #[test]
    fn applied_signals_group_by_damping_ratio() {
        let cases = vec![
            case(0.0, 0.01, &[1.0]),
            case(0.0, 0.02, &[1.0]),
            case(90.0, 0.02, &[1.0]),
        ];
        let calls = Cell::new(0);
        let loads = |p: &CaseParameters| -> Result<ForcesData> {
            calls.set(calls.get() + 1);
            Ok(applied(p.direction / 90.0 + 1.0))
        };

        let by_xi = group_by(&cases, Parameter::DampingRatio);
        let low = applied_extremes(&by_xi[0].cases, Signal::AppliedForce, &floor(), loads)
            .unwrap()
            .unwrap();
        assert_eq!((low.x.min, low.x.max), (-1.0, 1.0));

        let high = applied_extremes(&by_xi[1].cases, Signal::AppliedMoment, &floor(), loads)
            .unwrap()
            .unwrap();
        // overturning about y: Fx·Z with Z = 10, loads v = 1 and v = 2
        assert_eq!((high.y.min, high.y.max), (-20.0, 20.0));
        assert_eq!(high.y.mean, 0.0);
        assert_eq!(calls.get(), 3);

        // one load per (direction, period), however many damping ratios share it
        calls.set(0);
        let by_direction = group_by(&cases, Parameter::Direction);
        applied_extremes(&by_direction[0].cases, Signal::AppliedForce, &floor(), loads).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn applied_signal_is_not_read_from_results() {
        let a = case(0.0, 0.02, &[1.0]);
        assert!(extremes(&[&a], Signal::AppliedForce, &floor()).is_err());
        let response = applied_extremes(&[&a], Signal::Displacement, &floor(), |_| {
            panic!("response signals need no loads")
        })
        .unwrap()
        .unwrap();
        assert_eq!(response.x.max, 1.0);
    }

    #[test]
    fn no_cases_no_extremes() {
        assert!(extremes(&[], Signal::Displacement, &floor()).unwrap().is_none());
    }
}
