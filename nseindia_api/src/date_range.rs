//! Relative period tokens and their resolution into concrete `dd-mm-yyyy` bounds.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Local, Months, NaiveDate};

use crate::Error;

/// Date format the announcements route expects for `from_date` / `to_date`.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Named relative date ranges understood by [`resolve`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Period {
    Today,
    Last1Week,
    Next1Week,
    Last15Days,
    Next15Days,
    Last1Month,
    Next1Month,
    Last3Months,
    Next3Months,
    Last6Months,
    Last1Year,
    /// Caller supplies both bounds.
    Custom,
    /// No date filter; the host returns everything upcoming.
    #[default]
    AllForthcoming,
}

impl Period {
    pub const ALL: [Period; 13] = [
        Period::Today,
        Period::Last1Week,
        Period::Next1Week,
        Period::Last15Days,
        Period::Next15Days,
        Period::Last1Month,
        Period::Next1Month,
        Period::Last3Months,
        Period::Next3Months,
        Period::Last6Months,
        Period::Last1Year,
        Period::Custom,
        Period::AllForthcoming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Today => "Today",
            Period::Last1Week => "Last1Week",
            Period::Next1Week => "Next1Week",
            Period::Last15Days => "Last15Days",
            Period::Next15Days => "Next15Days",
            Period::Last1Month => "Last1Month",
            Period::Next1Month => "Next1Month",
            Period::Last3Months => "Last3Months",
            Period::Next3Months => "Next3Months",
            Period::Last6Months => "Last6Months",
            Period::Last1Year => "Last1Year",
            Period::Custom => "Custom",
            Period::AllForthcoming => "AllForthcoming",
        }
    }

    /// Fixed offset from today for named tokens. `None` for `Custom` and
    /// `AllForthcoming`, which carry no offset of their own.
    pub fn offset(&self) -> Option<Offset> {
        use Offset::{Back, Forward};
        use Span::{Days, Months};
        Some(match self {
            Period::Today => Back(Days(1)),
            Period::Last1Week => Back(Days(7)),
            Period::Next1Week => Forward(Days(7)),
            Period::Last15Days => Back(Days(15)),
            Period::Next15Days => Forward(Days(15)),
            Period::Last1Month => Back(Months(1)),
            Period::Next1Month => Forward(Months(1)),
            Period::Last3Months => Back(Months(3)),
            Period::Next3Months => Forward(Months(3)),
            Period::Last6Months => Back(Months(6)),
            Period::Last1Year => Back(Months(12)),
            Period::Custom | Period::AllForthcoming => return None,
        })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::UnknownPeriod(s.to_string()))
    }
}

/// Length of a relative period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Span {
    Days(u64),
    /// Calendar months, clamped to the last day of shorter months.
    Months(u32),
}

/// Direction of a relative period from today.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offset {
    /// `today - span ..= today`
    Back(Span),
    /// `today ..= today + span`
    Forward(Span),
}

/// An explicit range bound: either a calendar date or a string already in
/// `dd-mm-yyyy` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DateBound {
    Date(NaiveDate),
    Formatted(String),
}

impl From<NaiveDate> for DateBound {
    fn from(date: NaiveDate) -> Self {
        DateBound::Date(date)
    }
}

impl From<&str> for DateBound {
    fn from(s: &str) -> Self {
        DateBound::Formatted(s.to_string())
    }
}

impl From<String> for DateBound {
    fn from(s: String) -> Self {
        DateBound::Formatted(s)
    }
}

/// Resolved `(from_date, to_date)` pair, both formatted `dd-mm-yyyy`.
pub type Bounds = (String, String);

/// Resolves `period` against the local calendar date.
///
/// Returns `Ok(None)` for [`Period::AllForthcoming`] and an
/// [`Error::InvalidDateRange`] for combinations that cannot form a range.
pub fn resolve(
    period: Period,
    from_date: Option<DateBound>,
    to_date: Option<DateBound>,
) -> Result<Option<Bounds>, Error> {
    resolve_at(Local::now().date_naive(), period, from_date, to_date)
}

/// Same as [`resolve`] with an explicit "today".
pub fn resolve_at(
    today: NaiveDate,
    period: Period,
    from_date: Option<DateBound>,
    to_date: Option<DateBound>,
) -> Result<Option<Bounds>, Error> {
    if period == Period::AllForthcoming {
        return Ok(None);
    }

    match (period.offset(), from_date, to_date) {
        (Some(offset), None, None) => {
            let (from, to) = apply_offset(today, offset)?;
            Ok(Some((format_date(from), format_date(to))))
        }
        (None, Some(DateBound::Date(from)), Some(DateBound::Date(to))) => {
            Ok(Some((format_date(from), format_date(to))))
        }
        (None, Some(DateBound::Formatted(from)), Some(DateBound::Formatted(to))) => {
            Ok(Some((from, to)))
        }
        (None, Some(_), Some(_)) => Err(Error::InvalidDateRange(
            "from_date and to_date must both be dates or both be `dd-mm-yyyy` strings".into(),
        )),
        (None, _, _) => Err(Error::InvalidDateRange(
            "from_date and to_date can not be empty when the period is Custom".into(),
        )),
        (Some(_), _, _) => Err(Error::InvalidDateRange(format!(
            "explicit from_date/to_date require the Custom period, got {}",
            period
        ))),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn apply_offset(today: NaiveDate, offset: Offset) -> Result<(NaiveDate, NaiveDate), Error> {
    let out_of_range = || Error::InvalidDateRange(format!("{:?} from {} is out of range", offset, today));
    match offset {
        Offset::Back(span) => {
            let from = match span {
                Span::Days(n) => today.checked_sub_days(Days::new(n)),
                Span::Months(n) => today.checked_sub_months(Months::new(n)),
            }
            .ok_or_else(out_of_range)?;
            Ok((from, today))
        }
        Offset::Forward(span) => {
            let to = match span {
                Span::Days(n) => today.checked_add_days(Days::new(n)),
                Span::Months(n) => today.checked_add_months(Months::new(n)),
            }
            .ok_or_else(out_of_range)?;
            Ok((today, to))
        }
    }
}
