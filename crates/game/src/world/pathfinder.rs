use std::collections::VecDeque;

use super::collision::{TileCoord, WalkGrid};

/// Breadth-first search over 4-connected walkable tiles.
///
/// Returns the tile sequence from `start` to `goal` inclusive, or an empty
/// path when the goal is off the map, blocked, or unreachable. The start tile
/// itself is not required to be walkable so a player pressed against an
/// obstacle can still plan a route out.
pub fn find_path(grid: &WalkGrid, start: TileCoord, goal: TileCoord) -> Vec<TileCoord> {
    let (Some(start_index), Some(goal_index)) = (grid.index_of(start), grid.index_of(goal)) else {
        return Vec::new();
    };
    if !grid.is_walkable(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let node_count = grid.width() as usize * grid.height() as usize;
    let mut visited = vec![false; node_count];
    let mut parent = vec![None::<usize>; node_count];
    let mut frontier = VecDeque::new();
    visited[start_index] = true;
    frontier.push_back(start);

    while let Some(current) = frontier.pop_front() {
        let Some(current_index) = grid.index_of(current) else {
            continue;
        };
        if current_index == goal_index {
            return reconstruct_tile_path(&parent, grid.width(), start_index, goal_index)
                .unwrap_or_default();
        }
        for neighbor in grid.neighbors(current).into_iter().flatten() {
            let Some(neighbor_index) = grid.index_of(neighbor) else {
                continue;
            };
            if visited[neighbor_index] || !grid.is_walkable(neighbor) {
                continue;
            }
            visited[neighbor_index] = true;
            parent[neighbor_index] = Some(current_index);
            frontier.push_back(neighbor);
        }
    }

    Vec::new()
}

fn reconstruct_tile_path(
    parent: &[Option<usize>],
    width: u32,
    start_index: usize,
    goal_index: usize,
) -> Option<Vec<TileCoord>> {
    let mut cursor = goal_index;
    let mut indices = vec![cursor];

    while cursor != start_index {
        let next = parent.get(cursor).and_then(|value| *value)?;
        cursor = next;
        indices.push(cursor);
    }
    indices.reverse();
    Some(
        indices
            .into_iter()
            .map(|index| TileCoord {
                x: (index as u32) % width,
                y: (index as u32) / width,
            })
            .collect(),
    )
}
