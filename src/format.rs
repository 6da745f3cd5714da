// Presentation formatting: the strings a chat UI shows for names, presence,
// timestamps and delivery ticks. Everything here is pure.

use std::fmt::Display;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

use crate::models::{ContactStatus, DeliveryStatus};

const TIME_FORMAT: &str = "%-I:%M %p";
const PREVIEW_LIMIT: usize = 40;

/// Two-letter monogram for a name.
///
/// "Alice Johnson" -> "AJ", "Bob" -> "BO", "x" -> "X", "" -> "?".
pub fn initials(name: &str) -> String {
    if name.trim().is_empty() {
        return "?".to_string();
    }
    let mut parts = name.split(' ').filter(|part| !part.is_empty());
    let Some(first) = parts.next() else {
        return "?".to_string();
    };

    let picked: Vec<char> = match parts.next() {
        Some(second) => first.chars().take(1).chain(second.chars().take(1)).collect(),
        None => first.chars().take(2).collect(),
    };
    picked.into_iter().flat_map(char::to_uppercase).collect()
}

/// "just now", "5m ago", "3h ago", "2d ago", then "Mar 4".
pub fn relative_last_seen<Tz: TimeZone>(last_seen: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let elapsed = now.clone().signed_duration_since(last_seen.clone());
    let secs = elapsed.num_seconds();

    if secs < 60 {
        "just now".to_string()
    } else if secs < 60 * 60 {
        format!("{}m ago", secs / 60)
    } else if secs < 24 * 60 * 60 {
        format!("{}h ago", secs / (60 * 60))
    } else if secs < 7 * 24 * 60 * 60 {
        format!("{}d ago", secs / (24 * 60 * 60))
    } else {
        last_seen.format("%b %-d").to_string()
    }
}

/// Timestamp under a message bubble. Day boundaries follow `ts`'s own wall clock.
pub fn message_timestamp_label<Tz: TimeZone>(ts: &DateTime<Tz>, today: NaiveDate) -> String
where
    Tz::Offset: Display,
{
    match day_distance(ts.date_naive(), today) {
        DayDistance::Today => ts.format(TIME_FORMAT).to_string(),
        DayDistance::Yesterday => format!("Yesterday {}", ts.format(TIME_FORMAT)),
        DayDistance::ThisWeek => ts.format("%a %-I:%M %p").to_string(),
        DayDistance::Older => ts.format("%b %-d, %-I:%M %p").to_string(),
    }
}

/// Timestamp shown next to a conversation in the list.
pub fn conversation_time_label<Tz: TimeZone>(ts: &DateTime<Tz>, today: NaiveDate) -> String
where
    Tz::Offset: Display,
{
    match day_distance(ts.date_naive(), today) {
        DayDistance::Today => ts.format(TIME_FORMAT).to_string(),
        DayDistance::Yesterday => "Yesterday".to_string(),
        DayDistance::ThisWeek => ts.format("%a").to_string(),
        DayDistance::Older => ts.format("%b %-d").to_string(),
    }
}

enum DayDistance {
    Today,
    Yesterday,
    ThisWeek,
    Older,
}

fn day_distance(date: NaiveDate, today: NaiveDate) -> DayDistance {
    if date == today {
        DayDistance::Today
    } else if Some(date) == today.pred_opt() {
        DayDistance::Yesterday
    } else if today
        .checked_sub_signed(Duration::days(7))
        .map_or(true, |week_ago| date > week_ago)
    {
        DayDistance::ThisWeek
    } else {
        DayDistance::Older
    }
}

/// Delivery tick as rendered next to an outgoing bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryIndicator {
    pub glyph: &'static str,
    /// Set only for `Read`, which shares its glyph with `Delivered`.
    pub emphasized: bool,
    pub class: &'static str,
}

pub fn delivery_indicator(status: DeliveryStatus) -> DeliveryIndicator {
    let (glyph, class) = match status {
        DeliveryStatus::Sending => ("…", ""),
        DeliveryStatus::Sent => ("✓", ""),
        DeliveryStatus::Delivered => ("✓✓", ""),
        DeliveryStatus::Read => ("✓✓", "read"),
        DeliveryStatus::Failed => ("!", "failed"),
    };
    DeliveryIndicator {
        glyph,
        emphasized: status == DeliveryStatus::Read,
        class,
    }
}

pub fn status_label(status: ContactStatus, last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match (status, last_seen) {
        (ContactStatus::Online, _) => "Online".to_string(),
        (ContactStatus::Away, _) => "Away".to_string(),
        (ContactStatus::Busy, _) => "Busy".to_string(),
        (ContactStatus::Offline, Some(seen)) => format!(
            "Last seen {}",
            relative_last_seen(&seen.with_timezone(&Local), &now.with_timezone(&Local))
        ),
        (ContactStatus::Offline, None) => "Offline".to_string(),
    }
}

pub fn status_class(status: ContactStatus) -> &'static str {
    match status {
        ContactStatus::Online => "online",
        ContactStatus::Away => "away",
        ContactStatus::Busy => "busy",
        ContactStatus::Offline => "offline",
    }
}

/// Cut message content to the conversation list preview width.
pub fn truncate_preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_LIMIT) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("Alice Johnson"), "AJ");
        assert_eq!(initials("Bob"), "BO");
        assert_eq!(initials(""), "?");
        assert_eq!(initials("   "), "?");
        assert_eq!(initials("\t"), "?");
        assert_eq!(initials(" \n "), "?");
        assert_eq!(initials("\u{3000}"), "?");
        assert_eq!(initials("x"), "X");
        assert_eq!(initials("mary  ann lee"), "MA");
        assert_eq!(initials("élodie"), "ÉL");
    }

    #[test]
    fn test_relative_last_seen_thresholds() {
        let now = utc(2024, 3, 20, 12, 0);
        assert_eq!(relative_last_seen(&(now - Duration::seconds(59)), &now), "just now");
        assert_eq!(relative_last_seen(&(now + Duration::minutes(3)), &now), "just now");
        assert_eq!(relative_last_seen(&(now - Duration::seconds(60)), &now), "1m ago");
        assert_eq!(relative_last_seen(&(now - Duration::seconds(59 * 60 + 59)), &now), "59m ago");
        assert_eq!(relative_last_seen(&(now - Duration::minutes(60)), &now), "1h ago");
        assert_eq!(relative_last_seen(&(now - Duration::minutes(23 * 60 + 59)), &now), "23h ago");
        assert_eq!(relative_last_seen(&(now - Duration::hours(24)), &now), "1d ago");
        assert_eq!(relative_last_seen(&(now - Duration::hours(7 * 24 - 1)), &now), "6d ago");
        assert_eq!(relative_last_seen(&utc(2024, 3, 4, 9, 30), &now), "Mar 4");
    }

    #[test]
    fn test_message_timestamp_label() {
        let today = day(2024, 3, 20);
        assert_eq!(message_timestamp_label(&utc(2024, 3, 20, 15, 5), today), "3:05 PM");
        assert_eq!(message_timestamp_label(&utc(2024, 3, 20, 0, 10), today), "12:10 AM");
        assert_eq!(message_timestamp_label(&utc(2024, 3, 19, 9, 0), today), "Yesterday 9:00 AM");
        // 2024-03-15 is a Friday
        assert_eq!(message_timestamp_label(&utc(2024, 3, 15, 18, 45), today), "Fri 6:45 PM");
        assert_eq!(message_timestamp_label(&utc(2024, 3, 14, 8, 0), today), "Thu 8:00 AM");
        assert_eq!(message_timestamp_label(&utc(2024, 3, 13, 8, 0), today), "Mar 13, 8:00 AM");
    }

    #[test]
    fn test_conversation_time_label() {
        let today = day(2024, 3, 20);
        assert_eq!(conversation_time_label(&utc(2024, 3, 20, 11, 59), today), "11:59 AM");
        assert_eq!(conversation_time_label(&utc(2024, 3, 19, 23, 59), today), "Yesterday");
        assert_eq!(conversation_time_label(&utc(2024, 3, 18, 1, 0), today), "Mon");
        assert_eq!(conversation_time_label(&utc(2024, 2, 29, 1, 0), today), "Feb 29");
    }

    #[test]
    fn test_delivery_indicator() {
        assert_eq!(delivery_indicator(DeliveryStatus::Sending).glyph, "…");
        assert_eq!(delivery_indicator(DeliveryStatus::Sent).glyph, "✓");

        let delivered = delivery_indicator(DeliveryStatus::Delivered);
        let read = delivery_indicator(DeliveryStatus::Read);
        assert_eq!(delivered.glyph, "✓✓");
        assert_eq!(read.glyph, "✓✓");
        assert!(!delivered.emphasized);
        assert!(read.emphasized);
        assert_eq!(read.class, "read");

        let failed = delivery_indicator(DeliveryStatus::Failed);
        assert_eq!(failed.glyph, "!");
        assert_eq!(failed.class, "failed");
        assert!(!failed.emphasized);
    }

    #[test]
    fn test_status_label() {
        let now = utc(2024, 3, 20, 12, 0);
        assert_eq!(status_label(ContactStatus::Online, None, now), "Online");
        assert_eq!(status_label(ContactStatus::Busy, Some(now), now), "Busy");
        assert_eq!(status_label(ContactStatus::Offline, None, now), "Offline");
        assert_eq!(
            status_label(ContactStatus::Offline, Some(now - Duration::hours(2)), now),
            "Last seen 2h ago"
        );
        assert_eq!(status_class(ContactStatus::Away), "away");
    }

    #[test]
    fn test_truncate_preview() {
        let long = "a".repeat(50);
        let preview = truncate_preview(&long);
        assert_eq!(preview, format!("{}...", "a".repeat(40)));

        let exact = "b".repeat(40);
        assert_eq!(truncate_preview(&exact), exact);

        let wide = "é".repeat(45);
        assert_eq!(truncate_preview(&wide).chars().count(), 43);
    }
}
