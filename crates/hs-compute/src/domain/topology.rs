//! Structural invariants of the connectivity component.
//!
//! Only *active* coordinates take part: those whose diagonal has moved away
//! from the genesis value, or that touch at least one connectivity edge.
//! β₀ counts connected components among them (union-find); β₁ is the cycle
//! rank `E - V + β₀` of the connectivity graph.

use super::Components;
use shared_types::Invariants;

/// Diagonal value of the genesis (identity) state.
const GENESIS_DIAGONAL: f64 = 1.0;

/// Compute (β₀, β₁) from a decomposition.
pub fn structural_invariants(components: &Components, zero_tolerance: f64) -> Invariants {
    let connectivity = &components.connectivity;
    let n = connectivity.dimension();

    let mut active = vec![false; n];
    for (i, flag) in active.iter_mut().enumerate() {
        let moved = (components.stability.get(i, i) - GENESIS_DIAGONAL).abs() > zero_tolerance;
        let linked = (0..n).any(|j| j != i && connectivity.get(i, j) != 0.0);
        *flag = moved || linked;
    }

    let mut parent: Vec<usize> = (0..n).collect();
    let mut edges = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            if connectivity.get(i, j) == 0.0 {
                continue;
            }
            edges += 1;
            let ri = find(&mut parent, i);
            let rj = find(&mut parent, j);
            if ri != rj {
                parent[ri] = rj;
            }
        }
    }

    let vertices = active.iter().filter(|a| **a).count();
    let components_count = (0..n)
        .filter(|&i| active[i] && find(&mut parent, i) == i)
        .count();
    let cycles = (edges + components_count).saturating_sub(vertices);

    Invariants::new(saturate(components_count), saturate(cycles))
}

/// Union-find: path-compressed find.
fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn saturate(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}
