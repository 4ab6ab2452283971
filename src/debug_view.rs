use std::fmt::Write as _;

use rivulet_hydro::{FlowField, Tile};

const RAMP: &[u8] = b" .:-=+*#%@";

fn north_up_rows(flow: &FlowField) -> impl Iterator<Item = usize> {
    (0..flow.height()).rev()
}

/// Direction glyphs, north at the top. River cells print as `~`.
pub fn render_flow(tile: &Tile) -> String {
    let flow = &tile.flow;
    let mut river = vec![false; flow.len()];
    for r in &tile.rivers {
        for &(x, y) in &r.cells {
            river[flow.index(x, y)] = true;
        }
    }
    let mut out = String::with_capacity((flow.width() + 1) * flow.height());
    for y in north_up_rows(flow) {
        for x in 0..flow.width() {
            let c = if river[flow.index(x, y)] {
                '~'
            } else {
                flow.direction(x, y).glyph()
            };
            out.push(c);
        }
        out.push('\n');
    }
    out
}

/// Accumulation shaded on a log scale from ` ` (one cell) to `@` (the tile maximum).
pub fn render_accumulation(flow: &FlowField) -> String {
    let max = flow.accumulations().iter().copied().fold(1.0f32, f32::max);
    let span = max.ln();
    let last = (RAMP.len() - 1) as f32;
    let mut out = String::with_capacity((flow.width() + 1) * flow.height());
    for y in north_up_rows(flow) {
        for x in 0..flow.width() {
            let t = if span > 0.0 {
                flow.accumulation(x, y).max(1.0).ln() / span
            } else {
                0.0
            };
            let i = (t * last).round().clamp(0.0, last) as usize;
            out.push(RAMP[i] as char);
        }
        out.push('\n');
    }
    out
}

/// Header line plus both views side by side.
pub fn render_tile(tile: &Tile) -> String {
    let flow = render_flow(tile);
    let acc = render_accumulation(&tile.flow);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "tile {} {}x{} rivers={} resolved={}/4",
        tile.coord,
        tile.flow.width(),
        tile.flow.height(),
        tile.rivers.len(),
        tile.borders.resolved_count()
    );
    for (f, a) in flow.lines().zip(acc.lines()) {
        let _ = writeln!(out, "{f}  {a}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rivulet_lattice::TileCoord;
    use rivulet_terrain::{HeightGrid, HeightResponse};

    fn tile(rows: &[&[f32]], threshold: f32) -> Tile {
        let g = Arc::new(HeightGrid::from_rows(rows));
        Tile::build(TileCoord::new(0, 0), g, Arc::new(HeightResponse::identity()), 1, threshold)
    }

    #[test]
    fn west_slope_draws_arrows_and_a_river() {
        let t = tile(&[&[0.0, 1.0, 2.0, 3.0]], 100.0);
        assert_eq!(render_flow(&t), ".<<<\n");
        let t = tile(&[&[0.0, 1.0, 2.0, 3.0]], 2.0);
        // Cells with accumulation >= 2 form the river; the headwater cell stays an arrow.
        assert_eq!(render_flow(&t), "~~~<\n");
    }

    #[test]
    fn north_row_prints_first() {
        // Second row of the grid is the south edge.
        let t = tile(&[&[5.0, 5.0], &[0.0, 9.0]], 100.0);
        let view = render_flow(&t);
        let lines: Vec<&str> = view.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].chars().next(), Some('.'));
    }

    #[test]
    fn accumulation_ramp_spans_the_tile() {
        let t = tile(&[&[0.0, 1.0, 2.0, 3.0]], 100.0);
        let acc = render_accumulation(&t.flow);
        assert_eq!(acc.len(), 5);
        assert!(acc.starts_with('@'));
        assert_eq!(acc.chars().nth(3), Some(' '));
    }

    #[test]
    fn tile_view_has_a_header_and_one_line_per_row() {
        let t = tile(&[&[1.0, 2.0], &[0.0, 3.0]], 100.0);
        let view = render_tile(&t);
        assert!(view.starts_with("tile (0, 0) 2x2 rivers=0 resolved=0/4"));
        assert_eq!(view.lines().count(), 3);
    }
}
