//! Maze Text Format
//!
//! One line per matrix row. Even columns are one character wide, odd
//! columns three:
//!
//! ```text
//! +---+---+
//! |       |
//! +   +---+
//! |       |
//! +---+---+
//! ```
//!
//! Walls render as `+` (posts), `---` (slots between vertically adjacent
//! cells) or `|` (slots between horizontally adjacent cells). Solution
//! positions render as `@` / `@@@`. Loading restores the wall/open
//! distinction only; all markers come back as open.

use std::fs;
use std::path::Path;

use crate::maze::grid::{CellMark, Coord, Grid};

/// Errors reading or writing maze files.
#[derive(Debug, thiserror::Error)]
pub enum MazeFileError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The text does not describe a maze.
    #[error("Malformed maze text at line {line}: {reason}")]
    Malformed {
        /// 1-based line number (0 for whole-file problems).
        line: usize,
        /// What was wrong.
        reason: String,
    },
}

/// Render a grid in the text format.
pub fn to_text(grid: &Grid) -> String {
    let mut out = String::new();
    for y in 0..grid.matrix_height() {
        for x in 0..grid.matrix_width() {
            let mark = grid.query(x, y).unwrap_or(CellMark::Wall);
            let wide = x % 2 == 1;
            let glyph = match mark {
                CellMark::Wall if (x + y) % 2 == 0 => "+",
                CellMark::Wall if wide => "---",
                CellMark::Wall => "|",
                CellMark::Solution if wide => "@@@",
                CellMark::Solution => "@",
                _ if wide => "   ",
                _ => " ",
            };
            out.push_str(glyph);
        }
        out.push('\n');
    }
    out
}

/// Parse the text format back into a grid.
///
/// Trailing whitespace may be trimmed from lines; missing columns read as
/// open.
pub fn from_text(text: &str) -> Result<Grid, MazeFileError> {
    let lines: Vec<Vec<char>> = text
        .lines()
        .map(|l| l.trim_end_matches('\r').chars().collect())
        .filter(|l: &Vec<char>| !l.is_empty())
        .collect();

    let rows = lines.len();
    if rows < 3 || rows % 2 == 0 {
        return Err(MazeFileError::Malformed {
            line: 0,
            reason: format!("expected an odd number (>= 3) of rows, found {}", rows),
        });
    }

    // Row 0 is the fully walled top border: 4*width + 1 characters.
    let top = lines[0].len();
    if top < 5 || (top - 1) % 4 != 0 {
        return Err(MazeFileError::Malformed {
            line: 1,
            reason: format!("border row has invalid length {}", top),
        });
    }
    let width = ((top - 1) / 4) as u32;
    let height = ((rows - 1) / 2) as u32;

    let mut grid = Grid::new(width, height);
    grid.fill(CellMark::Open);

    for (y, line) in lines.iter().enumerate() {
        if line.len() > top {
            return Err(MazeFileError::Malformed {
                line: y + 1,
                reason: format!("row is {} characters, border is {}", line.len(), top),
            });
        }

        let mut col = 0usize;
        for x in 0..grid.matrix_width() {
            let span = if x % 2 == 1 { 3 } else { 1 };
            let glyph = line.get(col).copied().unwrap_or(' ');
            col += span;

            let mark = match glyph {
                '+' | '|' | '-' => CellMark::Wall,
                ' ' | '@' => CellMark::Open,
                other => {
                    return Err(MazeFileError::Malformed {
                        line: y + 1,
                        reason: format!("unexpected character '{}'", other),
                    })
                }
            };
            grid.set(Coord::new(x, y as i32), mark).map_err(|e| MazeFileError::Malformed {
                line: y + 1,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(grid)
}

/// Write a grid to a file.
pub fn save(grid: &Grid, path: impl AsRef<Path>) -> Result<(), MazeFileError> {
    fs::write(path, to_text(grid))?;
    Ok(())
}

/// Read a grid from a file.
pub fn load(path: impl AsRef<Path>) -> Result<Grid, MazeFileError> {
    let text = fs::read_to_string(path)?;
    from_text(&text)
}

/// Timestamped file name used for saved mazes.
pub fn timestamped_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("maze_{}.txt", now.format("%H_%M_%S-%d_%m_%Y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::MazeRng;
    use crate::maze::generator::{generate, Algorithm};
    use crate::maze::solver::mark_solution;
    use proptest::prelude::*;

    fn wall_classification(grid: &Grid) -> Vec<bool> {
        let mut out = Vec::new();
        for y in 0..grid.matrix_height() {
            for x in 0..grid.matrix_width() {
                out.push(grid.is_wall(Coord::new(x, y)));
            }
        }
        out
    }

    #[test]
    fn test_render_uncarved_1x1() {
        let grid = Grid::new(1, 1);
        assert_eq!(to_text(&grid), "+---+\n|   |\n+---+\n");
    }

    #[test]
    fn test_render_solution_glyphs() {
        let mut grid = Grid::new(2, 1);
        grid.carve_between(
            crate::maze::grid::LogicalCell::new(0, 0),
            crate::maze::grid::LogicalCell::new(1, 0),
        );
        mark_solution(&mut grid).unwrap();
        assert_eq!(to_text(&grid), "+---+---+\n|@@@@@@@|\n+---+---+\n");
    }

    #[test]
    fn test_markers_are_dropped_on_reload() {
        let mut rng = MazeRng::from_seed(8);
        let mut grid = generate(6, 6, Algorithm::Dfs, &mut rng);
        let walls = wall_classification(&grid);
        mark_solution(&mut grid).unwrap();
        grid.mark_endpoints();

        let loaded = from_text(&to_text(&grid)).unwrap();
        assert_eq!(wall_classification(&loaded), walls);
        assert!(loaded.positions_of(CellMark::Solution).is_empty());
        assert!(loaded.positions_of(CellMark::Start).is_empty());
    }

    #[test]
    fn test_trimmed_trailing_spaces_still_load() {
        let grid = Grid::new(2, 2);
        let trimmed: String = to_text(&grid)
            .lines()
            .map(|l| format!("{}\n", l.trim_end()))
            .collect();
        let loaded = from_text(&trimmed).unwrap();
        assert_eq!(wall_classification(&loaded), wall_classification(&grid));
    }

    #[test]
    fn test_rejects_malformed_text() {
        assert!(matches!(from_text(""), Err(MazeFileError::Malformed { line: 0, .. })));
        assert!(matches!(from_text("+---+\n|   |\n"), Err(MazeFileError::Malformed { .. })));
        assert!(matches!(from_text("+--+\n|  |\n+--+\n"), Err(MazeFileError::Malformed { line: 1, .. })));
        assert!(matches!(
            from_text("+---+\n| x |\n+---+\n"),
            Err(MazeFileError::Malformed { line: 2, .. })
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let mut rng = MazeRng::from_seed(13);
        let grid = generate(9, 6, Algorithm::Prim, &mut rng);
        let path = std::env::temp_dir().join(format!("maze-duel-{}.txt", uuid::Uuid::new_v4()));

        save(&grid, &path).unwrap();
        let loaded = load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, grid);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load("/definitely/not/here/maze.txt");
        assert!(matches!(result, Err(MazeFileError::Io(_))));
    }

    #[test]
    fn test_timestamped_file_name() {
        use chrono::TimeZone;
        let when = chrono::Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(timestamped_file_name(when), "maze_14_05_07-09_03_2024.txt");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_save_then_load_preserves_walls(
            width in 6u32..=19,
            height in 6u32..=19,
            seed in any::<u64>(),
        ) {
            let grid = generate(width, height, Algorithm::Dfs, &mut MazeRng::from_seed(seed));
            let loaded = from_text(&to_text(&grid)).unwrap();
            prop_assert_eq!(loaded.width(), width);
            prop_assert_eq!(loaded.height(), height);
            prop_assert_eq!(wall_classification(&loaded), wall_classification(&grid));
        }
    }
}
