//! Terminal rendering of the scoreboard. Everything returns strings so commands decide where
//! they go and tests can look at them.

use ansi_term::{Colour, Style};
use chrono::{DateTime, Local};

use crate::{
    settings::Settings,
    sync::ReadOutcome,
    tally::{progress::MonthProgress, score::Totals, PenaltyRecord, User},
};

const BAR_WIDTH: usize = 30;
const HISTORY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Colours are optional so output stays readable when piped.
pub struct Palette {
    colored: bool,
}

impl Palette {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.colored {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    }
}

pub fn render_board(
    document: &[PenaltyRecord],
    settings: &Settings,
    now: DateTime<Local>,
    palette: &Palette,
) -> String {
    let totals = Totals::from_records(document);
    let mut lines = vec![];
    lines.extend(render_month_progress(MonthProgress::at(now.naive_local()), palette));
    lines.push(String::new());
    lines.push(render_tug_of_war(totals, settings, palette));
    lines.push(render_scores(totals, settings, palette));
    lines.push(String::new());
    lines.extend(render_history(document, settings, palette));
    lines.join("\n")
}

fn render_month_progress(progress: MonthProgress, palette: &Palette) -> [String; 2] {
    let unit = if progress.days_left == 1 { "day" } else { "days" };
    let filled = progress.elapsed.cells(BAR_WIDTH);
    let bar = format!(
        "{}{}",
        palette.paint(Colour::Green.normal(), &"█".repeat(filled)),
        "░".repeat(BAR_WIDTH - filled)
    );
    [
        format!("⏳ {} {unit} left in the month", progress.days_left),
        format!("[{bar}] {}", progress.elapsed),
    ]
}

/// The knot sits at user A's share of all penalties.
fn render_tug_of_war(totals: Totals, settings: &Settings, palette: &Palette) -> String {
    let left = totals.tug_of_war().cells(BAR_WIDTH);
    format!(
        "{} {}🎁{} {}",
        settings.name(User::A),
        palette.paint(Colour::Blue.normal(), &"█".repeat(left)),
        palette.paint(Colour::Purple.normal(), &"▒".repeat(BAR_WIDTH - left)),
        settings.name(User::B),
    )
}

fn render_scores(totals: Totals, settings: &Settings, palette: &Palette) -> String {
    let leader = totals.leader();
    [User::A, User::B]
        .into_iter()
        .map(|user| {
            let card = format!("{}: {}", settings.name(user), totals.of(user));
            if leader == Some(user) {
                format!("🏆 {}", palette.paint(Colour::Green.bold(), &card))
            } else {
                palette.paint(Style::new().bold(), &card)
            }
        })
        .collect::<Vec<_>>()
        .join("    ")
}

/// Newest first.
fn render_history(
    document: &[PenaltyRecord],
    settings: &Settings,
    palette: &Palette,
) -> Vec<String> {
    let mut lines = vec![palette.paint(Style::new().bold(), "📜 Penalty history")];
    if document.is_empty() {
        lines.push("No penalties yet, well done! ✨".into());
        return lines;
    }
    lines.extend(document.iter().rev().map(|record| {
        format!(
            "  {} • {} • {}  {}",
            record
                .timestamp
                .with_timezone(&Local)
                .format(HISTORY_DATE_FORMAT),
            record.kind,
            settings.name(record.user),
            palette.paint(Colour::Fixed(244).normal(), &format!("[{}]", record.short_id())),
        )
    }));
    lines
}

/// One line explaining a read that didn't bring fresh data, if the user should know about it.
pub fn describe_read(outcome: ReadOutcome) -> Option<&'static str> {
    match outcome {
        ReadOutcome::Disabled => Some(
            "Sync is off. Set a token with `penalty-tracker config set --owner <owner> --repo <repo> --token <token>`",
        ),
        ReadOutcome::Failed => Some("Couldn't load the shared document, see the log for details"),
        ReadOutcome::Missing | ReadOutcome::Updated => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone, Utc};

    use crate::{
        settings::Settings,
        sync::ReadOutcome,
        tally::{PenaltyKind, PenaltyRecord, User},
    };

    use super::{describe_read, render_board, Palette};

    fn record(id: &str, user: User, kind: PenaltyKind, day: u32) -> PenaltyRecord {
        PenaltyRecord {
            id: id.into(),
            user,
            kind,
            timestamp: Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap(),
        }
    }

    fn now() -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_board_praises_everyone() {
        let board = render_board(&[], &Settings::default(), now(), &Palette::new(false));

        assert!(board.contains("No penalties yet"));
        assert!(board.contains("Ksyusha: 0"));
        assert!(board.contains("Kirill: 0"));
        assert!(!board.contains('🏆'));
        assert!(board.contains("16 days left in the month"));
        // Rope knot in the middle.
        let rope = format!("Ksyusha {}🎁{} Kirill", "█".repeat(15), "▒".repeat(15));
        assert!(board.contains(&rope));
    }

    #[test]
    fn leader_gets_trophy_and_history_is_newest_first() {
        let document = vec![
            record("aaaaaaaa-1", User::B, PenaltyKind::Trash, 3),
            record("bbbbbbbb-2", User::B, PenaltyKind::Stove, 4),
            record("cccccccc-3", User::A, PenaltyKind::Dishes, 5),
        ];
        let board = render_board(&document, &Settings::default(), now(), &Palette::new(false));

        assert!(board.contains("🏆 Ksyusha: 1"));
        assert!(board.contains("Kirill: 2"));
        let newest = board.find("[cccccccc]").unwrap();
        let oldest = board.find("[aaaaaaaa]").unwrap();
        assert!(newest < oldest);
        assert!(board.contains("🍽️ Didn't wash the dishes • Ksyusha"));
    }

    #[test]
    fn custom_names_are_used() {
        let settings = Settings {
            name_a: "Alex".into(),
            name_b: "Sam".into(),
            ..Settings::default()
        };
        let document = vec![record("r1", User::A, PenaltyKind::Trash, 1)];
        let board = render_board(&document, &settings, now(), &Palette::new(false));

        assert!(board.contains("🏆 Sam: 0"));
        assert!(board.contains("Alex: 1"));
        assert!(board.contains("• Alex"));
    }

    #[test]
    fn plain_palette_has_no_escape_codes() {
        let board = render_board(&[], &Settings::default(), now(), &Palette::new(false));
        assert!(!board.contains('\u{1b}'));
        let colored = render_board(&[], &Settings::default(), now(), &Palette::new(true));
        assert!(colored.contains('\u{1b}'));
    }

    #[test]
    fn only_unexpected_reads_are_described() {
        assert!(describe_read(ReadOutcome::Disabled).is_some());
        assert!(describe_read(ReadOutcome::Failed).is_some());
        assert!(describe_read(ReadOutcome::Missing).is_none());
        assert!(describe_read(ReadOutcome::Updated).is_none());
    }
}
