use chrono::{
  DateTime,
  Local,
  SecondsFormat,
  Utc
};

/// ISO-8601 in UTC with millisecond
/// precision, e.g.
/// `2026-10-19T08:30:00.000Z`. Values in
/// this shape sort lexicographically.
pub fn format_timestamp(
  at: DateTime<Utc>
) -> String {
  at.to_rfc3339_opts(
    SecondsFormat::Millis,
    true
  )
}

pub fn parse_timestamp(
  raw: &str
) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(
    raw.trim()
  )
  .ok()
  .map(|dt| dt.with_timezone(&Utc))
}

/// `updatedAt` for a write made at
/// `now`; never earlier than
/// `created_at`.
pub fn refreshed_updated_at(
  created_at: &str,
  now: DateTime<Utc>
) -> String {
  let stamped = format_timestamp(now);
  match parse_timestamp(created_at) {
    | Some(created) if created > now => {
      created_at.to_string()
    }
    | _ => stamped
  }
}

/// Short local rendering for tables;
/// falls back to the raw value when it
/// does not parse.
pub fn display_local(
  raw: &str
) -> String {
  parse_timestamp(raw)
    .map(|dt| {
      dt.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
    })
    .unwrap_or_else(|| raw.to_string())
}
