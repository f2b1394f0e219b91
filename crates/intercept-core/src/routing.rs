//! Shortest paths over tiny dense graphs.
//!
//! The avoidance graph has six nodes (source, four obstacle corners, target),
//! so a dense adjacency matrix with a linear minimum scan is all that is needed.
//! A missing edge is `None`; zero-cost edges are legal and never mean "blocked".

/// Dense adjacency matrix. `weights[i][j]` is the cost of `i -> j`.
pub type Adjacency<const N: usize> = [[Option<f64>; N]; N];

/// Node indices from `source` to `target` inclusive, or `None` if unreachable.
pub fn shortest_path<const N: usize>(
    weights: &Adjacency<N>,
    source: usize,
    target: usize,
) -> Option<Vec<usize>> {
    if source >= N || target >= N {
        return None;
    }

    let mut cost = [f64::INFINITY; N];
    let mut parent: [Option<usize>; N] = [None; N];
    let mut closed = [false; N];
    cost[source] = 0.0;

    loop {
        // Cheapest open node
        let current = (0..N)
            .filter(|&i| !closed[i] && cost[i].is_finite())
            .min_by(|&a, &b| cost[a].total_cmp(&cost[b]))?;

        if current == target {
            break;
        }
        closed[current] = true;

        for next in 0..N {
            if closed[next] {
                continue;
            }
            let Some(weight) = weights[current][next] else {
                continue;
            };
            let new_cost = cost[current] + weight;
            if new_cost < cost[next] {
                cost[next] = new_cost;
                parent[next] = Some(current);
            }
        }
    }

    let mut path = vec![target];
    let mut node = target;
    while let Some(prev) = parent[node] {
        path.push(prev);
        node = prev;
    }
    path.reverse();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symmetric<const N: usize>(edges: &[(usize, usize, f64)]) -> Adjacency<N> {
        let mut w = [[None; N]; N];
        for &(a, b, c) in edges {
            w[a][b] = Some(c);
            w[b][a] = Some(c);
        }
        w
    }

    #[test]
    fn prefers_cheaper_detour() {
        let w = symmetric::<4>(&[(0, 3, 10.0), (0, 1, 2.0), (1, 2, 2.0), (2, 3, 2.0)]);
        let path = shortest_path(&w, 0, 3).unwrap();
        assert_eq!(path, vec![0, 1, 2, 3]);
    }

    #[test]
    fn missing_edges_disconnect() {
        let w = symmetric::<4>(&[(0, 1, 1.0), (2, 3, 1.0)]);
        assert!(shortest_path(&w, 0, 3).is_none());
    }

    #[test]
    fn zero_weight_edges_are_real_edges() {
        let w = symmetric::<3>(&[(0, 1, 0.0), (1, 2, 0.0)]);
        assert_eq!(shortest_path(&w, 0, 2), Some(vec![0, 1, 2]));
    }

    #[test]
    fn source_equals_target() {
        let w = symmetric::<2>(&[]);
        assert_eq!(shortest_path(&w, 1, 1), Some(vec![1]));
        assert!(shortest_path(&w, 0, 5).is_none());
    }
}
