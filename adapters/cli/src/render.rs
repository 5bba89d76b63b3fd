//! Plain-text rendering of the board and status line.

use std::fmt::Write as _;

use tile_merge_core::SessionSnapshot;
use tile_merge_system_powerups::{Inventory, Powerup};

/// Width reserved for each cell, wide enough for five-digit tiles.
const CELL_WIDTH: usize = 6;

/// Renders the grid as a boxed table followed by the score line.
pub(crate) fn board(snapshot: &SessionSnapshot) -> String {
    let columns = snapshot.grid.first().map_or(0, Vec::len);
    let separator = format!(
        "+{}\n",
        vec!["-".repeat(CELL_WIDTH); columns].join("+") + "+"
    );

    let mut out = String::new();
    out.push_str(&separator);
    for row in &snapshot.grid {
        out.push('|');
        for cell in row {
            let label = cell
                .as_ref()
                .map(|tile| tile.value().to_string())
                .unwrap_or_default();
            let _ = write!(out, "{label:^width$}|", width = CELL_WIDTH);
        }
        out.push('\n');
        out.push_str(&separator);
    }
    let _ = writeln!(
        out,
        "score {}  best {}",
        snapshot.score, snapshot.best_score
    );
    out
}

/// Describes why moves are refused, if they are.
pub(crate) fn status(snapshot: &SessionSnapshot) -> Option<&'static str> {
    if snapshot.is_game_over {
        Some("game over - `n` starts a new game")
    } else if snapshot.is_won && !snapshot.keep_playing {
        Some("you win! - `c` keeps playing, `n` starts a new game")
    } else {
        None
    }
}

/// Summarises the remaining powerup charges.
pub(crate) fn inventory(inventory: Inventory) -> String {
    format!(
        "shuffle {}  remove {}  bonus undo {}",
        inventory.charges(Powerup::Shuffle),
        inventory.charges(Powerup::Remove),
        inventory.charges(Powerup::Undo)
    )
}
