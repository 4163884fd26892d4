use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::warn;

use super::RemoteFile;
use crate::config::paths::BACKUP_DATE_FORMAT;

/// `DD-MM-YYYY` anywhere in a file name.
fn date_token() -> &'static Regex {
    static DATE_TOKEN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\d{2}-\d{2}-\d{4}").expect("date token pattern is valid"));
    &DATE_TOKEN
}

/// Date embedded in a backup file name, from the first `DD-MM-YYYY` token.
pub fn backup_date(name: &str) -> Option<NaiveDate> {
    let token = date_token().find(name)?;
    NaiveDate::parse_from_str(token.as_str(), BACKUP_DATE_FORMAT).ok()
}

/// The candidate with the latest embedded date.
///
/// Names without a parseable date are skipped. Equal dates resolve to the
/// greatest name, then the greatest id, so listing order never matters.
pub fn select_latest(candidates: &[RemoteFile]) -> Option<RemoteFile> {
    candidates
        .iter()
        .filter_map(|file| match backup_date(&file.name) {
            Some(date) => Some((date, file)),
            None => {
                warn!(file_name = %file.name, file_id = %file.id, "Skipping file without a backup date");
                None
            }
        })
        .max_by(|(a_date, a), (b_date, b)| {
            a_date
                .cmp(b_date)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        })
        .map(|(_, file)| file.clone())
}
