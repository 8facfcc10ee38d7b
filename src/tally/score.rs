use crate::utils::percentage::{ratio_percentage, Percentage};

use super::{PenaltyRecord, User};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub a: usize,
    pub b: usize,
}

impl Totals {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a PenaltyRecord>) -> Self {
        records
            .into_iter()
            .fold(Totals::default(), |mut totals, record| {
                match record.user {
                    User::A => totals.a += 1,
                    User::B => totals.b += 1,
                }
                totals
            })
    }

    pub fn of(&self, user: User) -> usize {
        match user {
            User::A => self.a,
            User::B => self.b,
        }
    }

    /// Whoever collected fewer penalties leads. Nobody does on a tie.
    pub fn leader(&self) -> Option<User> {
        match self.a.cmp(&self.b) {
            std::cmp::Ordering::Less => Some(User::A),
            std::cmp::Ordering::Greater => Some(User::B),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Share of all penalties that belongs to user A, the position of the rope knot. Starts in
    /// the middle while nobody has any.
    pub fn tug_of_war(&self) -> Percentage {
        ratio_percentage(self.a as f64, (self.a + self.b) as f64).unwrap_or(Percentage::HALF)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::tally::{PenaltyKind, PenaltyRecord, User};

    use super::Totals;

    #[test]
    fn counts_per_user() {
        let records = [
            PenaltyRecord::new(User::A, PenaltyKind::Trash, Utc::now()),
            PenaltyRecord::new(User::B, PenaltyKind::Dishes, Utc::now()),
            PenaltyRecord::new(User::B, PenaltyKind::Stove, Utc::now()),
        ];
        let totals = Totals::from_records(&records);
        assert_eq!(totals, Totals { a: 1, b: 2 });
        assert_eq!(totals.of(User::B), 2);
    }

    #[test]
    fn fewer_penalties_lead() {
        assert_eq!(Totals { a: 1, b: 2 }.leader(), Some(User::A));
        assert_eq!(Totals { a: 4, b: 0 }.leader(), Some(User::B));
        assert_eq!(Totals { a: 3, b: 3 }.leader(), None);
    }

    #[test]
    fn rope_starts_centered() {
        assert_eq!(*Totals::default().tug_of_war(), 50.);
        assert_eq!(*Totals { a: 1, b: 3 }.tug_of_war(), 25.);
        assert_eq!(*Totals { a: 2, b: 0 }.tug_of_war(), 100.);
    }
}
