use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Weekday
// ---------------------------------------------------------------------------

/// Canonical day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// Position in the week, Monday = 0.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = WeekdayParseError;

    /// Accepts full English names and three-letter abbreviations in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|day| {
                let name = day.as_str().to_lowercase();
                lower == name || (lower.len() == 3 && name.starts_with(&lower))
            })
            .ok_or_else(|| WeekdayParseError(s.to_owned()))
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Self::ALL[day.num_days_from_monday() as usize]
    }
}

/// Error returned when parsing an invalid [`Weekday`] string.
#[derive(Debug, Clone)]
pub struct WeekdayParseError(pub String);

impl fmt::Display for WeekdayParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid weekday: {:?}", self.0)
    }
}

impl std::error::Error for WeekdayParseError {}

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Label words the engine looks for. All entries are lowercase; labels are
/// matched as case-insensitive substrings, rest words as whole words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    pub name: &'static str,
    /// Aliases per weekday, indexed by [`Weekday::index`].
    pub days: [&'static [&'static str]; 7],
    pub exercise: &'static str,
    pub group: &'static str,
    pub reps: &'static str,
    pub link: &'static str,
    pub specialty: &'static str,
    pub sets: &'static str,
    pub weight: &'static str,
    /// Whole words that mark a slot as a rest day.
    pub rest: &'static [&'static str],
}

impl Vocabulary {
    pub fn english() -> Self {
        Self {
            name: "english",
            days: [
                &["monday"],
                &["tuesday"],
                &["wednesday"],
                &["thursday"],
                &["friday"],
                &["saturday"],
                &["sunday"],
            ],
            exercise: "exercise",
            group: "group",
            reps: "reps",
            link: "link",
            specialty: "specialty",
            sets: "sets",
            weight: "weight",
            rest: &["rest"],
        }
    }

    pub fn russian() -> Self {
        Self {
            name: "russian",
            days: [
                &["понедельник"],
                &["вторник"],
                &["среда", "среду"],
                &["четверг"],
                &["пятница", "пятницу"],
                &["суббота", "субботу"],
                &["воскресенье"],
            ],
            exercise: "упражнение",
            group: "группа",
            reps: "повторы",
            link: "ссылка",
            specialty: "особенность",
            sets: "подход",
            weight: "вес",
            rest: &["отдых", "отдыха", "отдыхаем", "выходной"],
        }
    }

    /// Built-in vocabulary by name (`english`, `russian`).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "english" | "en" => Some(Self::english()),
            "russian" | "ru" => Some(Self::russian()),
            _ => None,
        }
    }

    /// First weekday whose alias occurs in `text`.
    pub fn weekday_of(&self, text: &str) -> Option<Weekday> {
        let lower = text.to_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|day| self.days[day.index()].iter().any(|a| lower.contains(a)))
    }

    /// True when any word of `name` is a rest marker. Hyphenated words
    /// count as one word, so "Rest-pause curl" is an exercise.
    pub fn is_rest(&self, name: &str) -> bool {
        name.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '-'))
            .any(|word| self.rest.contains(&word))
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::english()
    }
}

/// Case-insensitive substring test used for every label lookup.
pub fn contains_label(cell: &str, label: &str) -> bool {
    cell.to_lowercase().contains(label)
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A contiguous header column range belonging to one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayBlock {
    pub day: Weekday,
    pub start_column: usize,
    /// Exclusive.
    pub end_column: usize,
}

/// Inclusive repetition range parsed from a reps cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepsRange {
    pub min: u32,
    pub max: u32,
}

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("regex for unsigned integers"));

/// All unsigned integers appearing in `text`, in order.
pub(crate) fn numbers(text: &str) -> impl Iterator<Item = u32> + '_ {
    NUMBER.find_iter(text).filter_map(|m| m.as_str().parse().ok())
}

/// One exercise as planned for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseRecord {
    pub name: String,
    pub muscle_group: String,
    pub set_count: u32,
    pub reps_spec: String,
    pub video_url: String,
    pub specialty_note: String,
    pub day: Weekday,
    pub source_row: usize,
}

impl ExerciseRecord {
    pub const DEFAULT_SET_COUNT: u32 = 4;

    /// `"8-12"` gives `8..=12`, `"10"` gives `10..=10`, no number gives `None`.
    pub fn reps_range(&self) -> Option<RepsRange> {
        let mut nums = numbers(&self.reps_spec);
        let first = nums.next()?;
        let second = nums.next().unwrap_or(first);
        Some(RepsRange {
            min: first.min(second),
            max: first.max(second),
        })
    }
}

/// Exercises per weekday. Every weekday is always present; an empty list
/// is a rest day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutPlan {
    days: BTreeMap<Weekday, Vec<ExerciseRecord>>,
}

impl WorkoutPlan {
    pub fn new() -> Self {
        Self {
            days: Weekday::ALL.into_iter().map(|d| (d, Vec::new())).collect(),
        }
    }

    pub(crate) fn push(&mut self, record: ExerciseRecord) {
        self.days.entry(record.day).or_default().push(record);
    }

    pub fn day(&self, day: Weekday) -> &[ExerciseRecord] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The exercises scheduled on the weekday of `date`.
    pub fn for_date(&self, date: NaiveDate) -> &[ExerciseRecord] {
        self.day(date.weekday().into())
    }

    pub fn rest_days(&self) -> Vec<Weekday> {
        self.days
            .iter()
            .filter(|(_, exercises)| exercises.is_empty())
            .map(|(day, _)| *day)
            .collect()
    }

    pub fn exercise_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    /// Days in week order with their exercises.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &[ExerciseRecord])> {
        self.days.iter().map(|(d, e)| (*d, e.as_slice()))
    }

    /// Look up an exercise by name on a given day.
    pub fn find(&self, name: &str, day: Weekday) -> Option<&ExerciseRecord> {
        self.day(day).iter().find(|e| e.name == name)
    }
}

impl Default for WorkoutPlan {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Row and column span where the per-set values of one exercise go.
/// All coordinates are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellSpan {
    pub row: usize,
    pub start_column: usize,
    /// Exclusive.
    pub end_column: usize,
}

impl CellSpan {
    /// Column of 1-based set `k`, or `None` when it falls outside the span.
    pub fn column_for_set(&self, k: u32) -> Option<usize> {
        if k == 0 {
            return None;
        }
        let column = self.start_column + (k as usize - 1);
        (column < self.end_column).then_some(column)
    }

    pub fn width(&self) -> usize {
        self.end_column.saturating_sub(self.start_column)
    }
}

/// `(exercise name, day) -> CellSpan`, bound to the grid it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionIndex {
    grid_id: Uuid,
    entries: HashMap<(String, Weekday), CellSpan>,
}

impl PositionIndex {
    pub fn new(grid_id: Uuid) -> Self {
        Self {
            grid_id,
            entries: HashMap::new(),
        }
    }

    /// Fetch identifier of the grid this index was built from.
    pub fn grid_id(&self) -> Uuid {
        self.grid_id
    }

    /// Insert a span, returning the one it replaced.
    pub fn insert(&mut self, name: &str, day: Weekday, span: CellSpan) -> Option<CellSpan> {
        self.entries.insert((name.to_owned(), day), span)
    }

    pub fn get(&self, name: &str, day: Weekday) -> Option<CellSpan> {
        self.entries.get(&(name.to_owned(), day)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by day, then row, then name.
    pub fn sorted(&self) -> Vec<(&str, Weekday, CellSpan)> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .map(|((name, day), span)| (name.as_str(), *day, *span))
            .collect();
        all.sort_by(|a, b| (a.1, a.2.row, a.0).cmp(&(b.1, b.2.row, b.0)));
        all
    }
}

/// Everything inferred from one grid.
#[derive(Debug, Clone)]
pub struct InferredLayout {
    pub plan: WorkoutPlan,
    pub positions: PositionIndex,
    pub day_blocks: Vec<DayBlock>,
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("grid has {rows} row(s); need a header and at least one data row")]
    InsufficientData { rows: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reps: &str) -> ExerciseRecord {
        ExerciseRecord {
            name: "Squat".into(),
            muscle_group: String::new(),
            set_count: ExerciseRecord::DEFAULT_SET_COUNT,
            reps_spec: reps.into(),
            video_url: String::new(),
            specialty_note: String::new(),
            day: Weekday::Monday,
            source_row: 1,
        }
    }

    #[test]
    fn weekday_parses_names_and_abbreviations() {
        assert_eq!("monday".parse::<Weekday>().unwrap(), Weekday::Monday);
        assert_eq!("WED".parse::<Weekday>().unwrap(), Weekday::Wednesday);
        assert_eq!(" Sunday ".parse::<Weekday>().unwrap(), Weekday::Sunday);
        assert!("someday".parse::<Weekday>().is_err());
        assert!("mo".parse::<Weekday>().is_err());
    }

    #[test]
    fn weekday_from_chrono() {
        assert_eq!(Weekday::from(chrono::Weekday::Mon), Weekday::Monday);
        assert_eq!(Weekday::from(chrono::Weekday::Sun), Weekday::Sunday);
    }

    #[test]
    fn reps_range_parses_ranges_and_single_numbers() {
        assert_eq!(
            record("8-12").reps_range(),
            Some(RepsRange { min: 8, max: 12 })
        );
        assert_eq!(
            record("10").reps_range(),
            Some(RepsRange { min: 10, max: 10 })
        );
        assert_eq!(
            record("12 - 8").reps_range(),
            Some(RepsRange { min: 8, max: 12 })
        );
        assert_eq!(record("max").reps_range(), None);
        assert_eq!(record("").reps_range(), None);
    }

    #[test]
    fn new_plan_has_every_weekday_as_rest() {
        let plan = WorkoutPlan::new();
        assert_eq!(plan.rest_days(), Weekday::ALL.to_vec());
        assert_eq!(plan.exercise_count(), 0);
        assert_eq!(plan.iter().count(), 7);
    }

    #[test]
    fn for_date_selects_weekday() {
        let mut plan = WorkoutPlan::new();
        plan.push(record("5"));
        // 2026-03-02 is a Monday.
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(plan.for_date(monday).len(), 1);
        assert!(plan.for_date(monday.succ_opt().unwrap()).is_empty());
    }

    #[test]
    fn span_excludes_sets_past_end() {
        let span = CellSpan {
            row: 2,
            start_column: 1,
            end_column: 3,
        };
        assert_eq!(span.column_for_set(1), Some(1));
        assert_eq!(span.column_for_set(2), Some(2));
        assert_eq!(span.column_for_set(3), None);
        assert_eq!(span.column_for_set(0), None);
        assert_eq!(span.width(), 2);
    }

    #[test]
    fn vocabulary_matches_case_insensitively() {
        let en = Vocabulary::english();
        assert_eq!(en.weekday_of("FRIDAY (pull)"), Some(Weekday::Friday));
        assert_eq!(en.weekday_of("notes"), None);
        assert!(en.is_rest("REST day"));
        assert!(en.is_rest("(rest)"));

        let ru = Vocabulary::russian();
        assert_eq!(ru.weekday_of("Среда - грудь"), Some(Weekday::Wednesday));
        assert!(contains_label("Упражнение", ru.exercise));
        assert_eq!(Vocabulary::by_name("RU"), Some(ru));
        assert!(Vocabulary::by_name("klingon").is_none());
    }

    #[test]
    fn rest_marker_is_a_whole_word() {
        let en = Vocabulary::english();
        assert!(!en.is_rest("Rest-pause curl"));
        assert!(!en.is_rest("Restricted-grip row"));
        assert!(!en.is_rest("Forest walk"));

        let ru = Vocabulary::russian();
        assert!(ru.is_rest("Отдыхаем"));
        assert!(ru.is_rest("День отдыха"));
        assert!(!ru.is_rest("Присед"));
    }

    #[test]
    fn russian_reps_label_is_plural() {
        let ru = Vocabulary::russian();
        assert_eq!(ru.reps, "повторы");
        assert!(contains_label("Повторы", ru.reps));
        assert!(!contains_label("Повтор", ru.reps));
    }
}
