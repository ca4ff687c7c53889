//! Topological ordering of configurations.
//!
//! Builds a directed graph (node = coordinate, edge = reference dependency)
//! and sorts it so every referenced coordinate precedes its referents. Ties
//! are broken lexicographically by coordinate, which makes runs reproducible
//! across hosts regardless of load order.

use crate::error::SortError;
use canopy_types::{Configuration, Coordinate};
use std::collections::{BTreeSet, HashMap};

/// Order configurations so that every reference resolves before use.
///
/// References to coordinates outside the project do not create edges; they
/// are rejected later, at resolution time. A dependency cycle is fatal and
/// reported with the full cycle path.
pub fn sort_configurations(
    configs: &[Configuration],
) -> Result<Vec<Configuration>, SortError> {
    let mut by_coordinate: HashMap<Coordinate, &Configuration> =
        HashMap::with_capacity(configs.len());
    for config in configs {
        if by_coordinate
            .insert(config.coordinate.clone(), config)
            .is_some()
        {
            return Err(SortError::DuplicateCoordinate {
                coordinate: config.coordinate.clone(),
            });
        }
    }

    // in-degree = number of not-yet-processed dependencies of a node
    let mut in_degree: HashMap<Coordinate, usize> = configs
        .iter()
        .map(|config| (config.coordinate.clone(), 0))
        .collect();
    let mut dependents: HashMap<Coordinate, Vec<Coordinate>> = HashMap::new();

    for config in configs {
        for dependency in config.references() {
            if !by_coordinate.contains_key(&dependency) {
                continue;
            }
            dependents
                .entry(dependency)
                .or_default()
                .push(config.coordinate.clone());
            if let Some(degree) = in_degree.get_mut(&config.coordinate) {
                *degree += 1;
            }
        }
    }

    // stable Kahn: always pick the lexicographically smallest ready node
    let mut ready: BTreeSet<Coordinate> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(coordinate, _)| coordinate.clone())
        .collect();
    let mut order: Vec<Coordinate> = Vec::with_capacity(configs.len());

    while let Some(next) = ready.iter().next().cloned() {
        ready.remove(&next);
        if let Some(children) = dependents.get(&next) {
            for child in children {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(child.clone());
                    }
                }
            }
        }
        order.push(next);
    }

    if order.len() != configs.len() {
        let remaining: BTreeSet<Coordinate> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(coordinate, _)| coordinate)
            .collect();
        return Err(SortError::Cycle {
            path: find_cycle(&remaining, &by_coordinate),
        });
    }

    Ok(order
        .into_iter()
        .filter_map(|coordinate| by_coordinate.get(&coordinate).map(|c| (*c).clone()))
        .collect())
}

/// Extract one concrete cycle from the unsortable remainder of the graph.
///
/// Every remaining node has at least one remaining dependency, so following
/// the smallest remaining dependency must revisit a node eventually.
fn find_cycle(
    remaining: &BTreeSet<Coordinate>,
    by_coordinate: &HashMap<Coordinate, &Configuration>,
) -> Vec<Coordinate> {
    let Some(start) = remaining.iter().next() else {
        return Vec::new();
    };

    let mut path: Vec<Coordinate> = Vec::new();
    let mut seen_at: HashMap<Coordinate, usize> = HashMap::new();
    let mut current = start.clone();

    loop {
        if let Some(&position) = seen_at.get(&current) {
            return path.split_off(position);
        }
        seen_at.insert(current.clone(), path.len());
        path.push(current.clone());

        let next = by_coordinate
            .get(&current)
            .map(|config| {
                let mut dependencies: Vec<Coordinate> = config
                    .references()
                    .into_iter()
                    .filter(|dependency| remaining.contains(dependency))
                    .collect();
                dependencies.sort();
                dependencies
            })
            .and_then(|dependencies| dependencies.into_iter().next());

        match next {
            Some(dependency) => current = dependency,
            None => return path,
        }
    }
}
