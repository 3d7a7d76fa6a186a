use chrono::NaiveDate;

use crate::{
    error::{RowError, SkippedRow},
    models::{Booking, Objective, User},
};

/// Field separator used by every record file.
pub const SEP: char = ';';

pub(crate) const USERS_HEADER: &str = "id;first_name;last_name;email";
pub(crate) const OBJECTIVES_HEADER: &str = "id;title;period;coins;available";
pub(crate) const BOOKINGS_HEADER: &str = "id;user_id;objective_id;date";
pub(crate) const EXPORT_HEADER: &str = "id;title;period;coins";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A record kind stored one-per-line in a flat file.
pub trait Record: Sized {
    /// Header line written at the top of the file.
    const HEADER: &'static str;
    /// Minimum number of fields a data line must have.
    const COLUMNS: usize;

    /// Parse already-split fields. `fields.len() >= COLUMNS` is guaranteed.
    fn from_fields(fields: &[&str]) -> Result<Self, RowError>;

    /// Render the record as a single line without the trailing newline.
    fn to_line(&self) -> String;
}

impl Record for User {
    const HEADER: &'static str = USERS_HEADER;
    const COLUMNS: usize = 4;

    fn from_fields(fields: &[&str]) -> Result<Self, RowError> {
        Ok(User {
            id: parse_int(fields[0], "id")?,
            first_name: fields[1].trim().to_string(),
            last_name: fields[2].trim().to_string(),
            email: fields[3].trim().to_string(),
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}{SEP}{}{SEP}{}{SEP}{}",
            self.id, self.first_name, self.last_name, self.email
        )
    }
}

impl Record for Objective {
    const HEADER: &'static str = OBJECTIVES_HEADER;
    const COLUMNS: usize = 5;

    fn from_fields(fields: &[&str]) -> Result<Self, RowError> {
        Ok(Objective::new(
            parse_int(fields[0], "id")?,
            fields[1].trim(),
            fields[2].trim(),
            parse_int(fields[3], "coins")?,
            parse_available(fields[4]),
        ))
    }

    fn to_line(&self) -> String {
        format!(
            "{}{SEP}{}",
            export_line(self),
            if self.is_available() { "YES" } else { "NO" }
        )
    }
}

impl Record for Booking {
    const HEADER: &'static str = BOOKINGS_HEADER;
    const COLUMNS: usize = 4;

    fn from_fields(fields: &[&str]) -> Result<Self, RowError> {
        Ok(Booking {
            id: parse_int(fields[0], "id")?,
            user_id: parse_int(fields[1], "user_id")?,
            objective_id: parse_int(fields[2], "objective_id")?,
            date: parse_date(fields[3])?,
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}{SEP}{}{SEP}{}{SEP}{}",
            self.id,
            self.user_id,
            self.objective_id,
            self.date.format(DATE_FORMAT)
        )
    }
}

/// Objective line without the availability column.
pub(crate) fn export_line(objective: &Objective) -> String {
    format!(
        "{}{SEP}{}{SEP}{}{SEP}{}",
        objective.id, objective.title, objective.period, objective.coins
    )
}

/// Records and rejected rows produced by reading one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome<T> {
    /// Successfully parsed records in file order.
    pub records: Vec<T>,
    /// Rows that were skipped, in file order.
    pub skipped: Vec<SkippedRow>,
}

impl<T> Default for ReadOutcome<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Parse the full contents of a record file. The first line is the header
/// and is not validated; blank lines are ignored.
pub fn parse_records<T: Record>(file: &str, content: &str) -> ReadOutcome<T> {
    let mut outcome = ReadOutcome::default();
    for (index, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line::<T>(line) {
            Ok(record) => outcome.records.push(record),
            Err(reason) => outcome.skipped.push(SkippedRow {
                file: file.to_string(),
                line: index + 1,
                reason,
                raw: line.to_string(),
            }),
        }
    }
    outcome
}

/// Parse a single data line.
pub fn parse_line<T: Record>(line: &str) -> Result<T, RowError> {
    let fields: Vec<&str> = line.split(SEP).collect();
    if fields.len() < T::COLUMNS {
        return Err(RowError::MissingFields {
            expected: T::COLUMNS,
            found: fields.len(),
        });
    }
    T::from_fields(&fields)
}

/// Availability tokens are permissive on read: `YES`, `SI` and `TRUE` in any
/// case mean available, anything else means not available.
pub fn parse_available(raw: &str) -> bool {
    let value = raw.trim();
    ["YES", "SI", "TRUE"]
        .iter()
        .any(|token| value.eq_ignore_ascii_case(token))
}

fn parse_int<T: std::str::FromStr>(raw: &str, column: &'static str) -> Result<T, RowError> {
    raw.trim().parse().map_err(|_| RowError::InvalidInteger {
        column,
        value: raw.trim().to_string(),
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, RowError> {
    let value = raw.trim();
    // `%Y` alone would also accept signed or short years.
    let well_formed = value.len() == 10
        && value
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if !well_formed {
        return Err(RowError::InvalidDate {
            value: value.to_string(),
        });
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| RowError::InvalidDate {
        value: value.to_string(),
    })
}

/// Strict `YYYY-MM-DD` parsing shared with interactive date prompts.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    parse_date(raw).ok()
}
