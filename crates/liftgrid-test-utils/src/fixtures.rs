//! Sample workout grids.
//!
//! Grids are plain `Vec<Vec<String>>` so every crate can wrap them in its
//! own types.

/// Convert string-slice rows into owned rows.
pub fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

/// Minimal two-day grid: Squat on Monday, Bench on Wednesday, one weight
/// row underneath.
pub fn three_column_grid() -> Vec<Vec<String>> {
    rows(&[
        &["", "Monday", "", "Wednesday", ""],
        &["Exercise", "Squat", "", "Bench", ""],
        &["Weight", "", "", "", ""],
    ])
}

/// A full week with attribute rows, a rest day and three-set spans.
///
/// Monday: Squat (legs), Romanian deadlift. Wednesday: Bench press (chest).
/// Friday: Pull-up. Every other day has no block or is marked rest.
pub fn weekly_grid() -> Vec<Vec<String>> {
    rows(&[
        &[
            "",
            "MONDAY - legs",
            "",
            "",
            "Wednesday (chest)",
            "",
            "",
            "friday",
            "",
            "",
            "Sunday",
        ],
        &["Muscle group", "Legs", "", "", "Chest", "", "", "Back", "", "", ""],
        &[
            "Exercise",
            "Squat",
            "",
            "",
            "Bench press",
            "",
            "",
            "Pull-up",
            "",
            "",
            "Rest",
        ],
        &["Sets", "3", "", "", "3 sets", "", "", "x", "", "", ""],
        &["Reps", "8-12", "", "", "5", "", "", "max", "", "", ""],
        &[
            "Video link",
            "https://video.example/squat",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ],
        &["Specialty", "pause at bottom", "", "", "", "", "", "", "", "", ""],
        &["Weight", "", "", "", "", "", "", "", "", "", ""],
        &["Exercise", "Romanian deadlift", "", "", "", "", "", "", "", "", ""],
        &["Reps", "10", "", "", "", "", "", "", "", "", ""],
        &["Weight", "", "", "", "", "", "", "", "", "", ""],
    ])
}

/// Two-day grid using the Russian label vocabulary.
pub fn russian_grid() -> Vec<Vec<String>> {
    rows(&[
        &["", "Понедельник", "", "Четверг", ""],
        &["Группа мышц", "Ноги", "", "Спина", ""],
        &["Упражнение", "Присед", "", "Тяга", ""],
        &["Повторы", "6-8", "", "10", ""],
        &["Вес", "", "", "", ""],
    ])
}

/// Render rows as CSV the way a spreadsheet export would.
pub fn to_csv(rows: &[Vec<String>]) -> String {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row).expect("writing to memory cannot fail");
    }
    let bytes = writer.into_inner().expect("flushing to memory cannot fail");
    String::from_utf8(bytes).expect("csv output is utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_quotes_cells_with_commas() {
        let csv = to_csv(&rows(&[&["a,b", "c"]]));
        assert_eq!(csv, "\"a,b\",c\n");
    }

    #[test]
    fn weekly_grid_is_ragged_free() {
        let grid = weekly_grid();
        let width = grid[0].len();
        assert!(grid.iter().all(|row| row.len() == width));
    }
}
