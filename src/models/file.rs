use chrono::{DateTime, Datelike, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Longest object key the local store can hold as a single filename.
pub const MAX_STORAGE_KEY_BYTES: usize = 255;

/// Fixed-width UTC form so that string order in SQL matches time order.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    pub id: String,
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub expires_at: String,
    pub created_at: String,
}

impl FileRecord {
    /// `None` when the expiry falls past year 9999, where the fixed-width
    /// timestamp form no longer holds.
    pub fn new(
        filename: String,
        file_size: i64,
        password_hash: Option<String>,
        expires_in: Duration,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let expires_at = now
            .checked_add_signed(expires_in)
            .filter(|time| time.year() <= 9999)?;
        let id = Uuid::new_v4().to_string();
        let file_path = storage_key(&id, &filename);

        Some(Self {
            id,
            filename,
            file_path,
            file_size,
            password_hash,
            expires_at: format_timestamp(expires_at),
            created_at: format_timestamp(now),
        })
    }

    pub fn requires_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// An unreadable timestamp counts as already expired.
    pub fn expires_at_time(&self) -> DateTime<Utc> {
        parse_timestamp(&self.expires_at).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at_time()
    }

    /// Whole seconds left before expiry, floored at zero. Display only.
    pub fn remaining_seconds_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at_time() - now).num_seconds().max(0)
    }
}

/// Object key for an upload: the record id, a dash, and the filename with
/// path separators and control characters replaced. The name part is cut on a
/// char boundary so the key fits in [`MAX_STORAGE_KEY_BYTES`].
pub fn storage_key(id: &str, filename: &str) -> String {
    let budget = MAX_STORAGE_KEY_BYTES.saturating_sub(id.len() + 1);
    let mut key = String::with_capacity(MAX_STORAGE_KEY_BYTES);
    key.push_str(id);
    key.push('-');

    let mut used = 0;
    for c in filename.chars() {
        let c = match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        };
        used += c.len_utf8();
        if used > budget {
            break;
        }
        key.push(c);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        parse_timestamp("2024-06-01T12:00:00Z").unwrap()
    }

    fn record(expires_in: Duration, now: DateTime<Utc>) -> FileRecord {
        FileRecord::new("report.pdf".to_string(), 10, None, expires_in, now).unwrap()
    }

    #[test]
    fn storage_key_is_derived_from_id_and_filename() {
        assert_eq!(storage_key("abc", "report.pdf"), "abc-report.pdf");
        assert_eq!(storage_key("abc", "../x/y\\z\n"), "abc-.._x_y_z_");
    }

    #[test]
    fn long_filenames_are_cut_to_fit_the_key() {
        let id = Uuid::new_v4().to_string();
        let name = format!("{}.pdf", "a".repeat(251));
        let key = storage_key(&id, &name);
        assert_eq!(key.len(), MAX_STORAGE_KEY_BYTES);
        assert!(key.starts_with(&format!("{}-aaaa", id)));

        let wide = "é".repeat(200);
        let key = storage_key(&id, &wide);
        assert!(key.len() <= MAX_STORAGE_KEY_BYTES);
        assert!(key.len() >= MAX_STORAGE_KEY_BYTES - 1);
    }

    #[test]
    fn expiry_past_year_9999_is_refused() {
        let now = fixed_now();
        assert!(FileRecord::new("a".into(), 1, None, Duration::days(3_000_000), now).is_none());
        assert!(FileRecord::new("a".into(), 1, None, Duration::MAX, now).is_none());
        assert!(FileRecord::new("a".into(), 1, None, Duration::days(365 * 100), now).is_some());
    }

    #[test]
    fn new_record_links_path_to_id() {
        let now = fixed_now();
        let file = record(Duration::minutes(1), now);

        assert_eq!(file.file_path, format!("{}-report.pdf", file.id));
        assert!(!file.requires_password());
        assert_eq!(file.expires_at_time(), now + Duration::minutes(1));
        assert_eq!(file.created_at, "2024-06-01T12:00:00.000000Z");
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = fixed_now();
        let file = record(Duration::minutes(1), now);
        let expires = file.expires_at_time();

        assert!(!file.is_expired_at(expires - Duration::microseconds(1)));
        assert!(file.is_expired_at(expires));
        assert!(file.is_expired_at(now + Duration::seconds(61)));
    }

    #[test]
    fn remaining_time_never_goes_negative() {
        let now = fixed_now();
        let file = record(Duration::minutes(1), now);

        assert_eq!(file.remaining_seconds_at(now), 60);
        assert_eq!(file.remaining_seconds_at(now + Duration::seconds(90)), 0);
    }

    #[test]
    fn timestamps_sort_lexically() {
        let base = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        let a = format_timestamp(base);
        let b = format_timestamp(base + Duration::milliseconds(500));
        let c = format_timestamp(base + Duration::seconds(1));

        assert_eq!(a, "2024-01-01T00:00:00.000000Z");
        assert!(a < b && b < c);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let mut file = record(Duration::minutes(5), fixed_now());
        file.password_hash = Some("deadbeef".to_string());

        let json = serde_json::to_value(&file).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["filename"], "report.pdf");
    }
}
