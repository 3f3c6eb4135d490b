//! ICS parsing using the icalendar crate's parser.

use icalendar::parser::{Component, Property, read_calendar, unfold};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use log::warn;

use super::FIELDS;
use crate::error::{CctoolError, CctoolResult};
use crate::formats::contentline::{parse_line, split_raw};
use crate::multidict::Record;
use crate::remap::{Direction, Unmapped, map_keys};
use crate::value::Value;

/// Parse every VEVENT in `content`, at any nesting depth.
pub fn parse_events(content: &str) -> CctoolResult<Vec<Record>> {
    let unfolded = split_categories(&unfold(content));
    let calendar = read_calendar(&unfolded).map_err(|e| CctoolError::format("ics", e.to_string()))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    Ok(vevents.into_iter().filter_map(parse_event).collect())
}

/// Put each CATEGORIES value on its own line. The parser unescapes text
/// values, after which `a\,b` and `a,b` can no longer be told apart.
fn split_categories(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.lines() {
        match parse_line(line).filter(|l| l.name == "CATEGORIES") {
            Some(parsed) => {
                let head = &line[..line.len() - parsed.value.len() - 1];
                for part in split_raw(&parsed.value, ',') {
                    out.push_str(head);
                    out.push(':');
                    out.push_str(part);
                    out.push_str("\r\n");
                }
            }
            None => {
                out.push_str(line);
                out.push_str("\r\n");
            }
        }
    }
    out
}

fn collect_vevents<'a>(components: &'a [Component<'a>], out: &mut Vec<&'a Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

/// Convert one VEVENT, or skip it if a date can't be read.
fn parse_event(vevent: &Component) -> Option<Record> {
    let mut record = Record::new();

    if let Some(freq) = vevent.find_prop("RRULE").and_then(|p| rrule_freq(p.val.as_ref())) {
        record.set("freq", vec![Value::from(freq)]);
    }

    for prop in &vevent.properties {
        let key = prop.name.as_ref().to_lowercase();
        if key == "freq" || FIELDS.translate(&key, Direction::Forward).is_none() {
            continue;
        }

        let values = match key.as_str() {
            "dtstart" | "dtend" => match to_value(prop) {
                Some(value) => vec![value],
                None => {
                    warn!("ics: skipping event with invalid {}: '{}'", prop.name.as_ref(), prop.val.as_ref());
                    return None;
                }
            },
            // already unescaped by the parser
            _ => vec![Value::from(prop.val.as_ref())],
        };
        record.append(key, values.into_iter().filter(|v| v.as_text() != Some("")));
    }

    Some(map_keys(&record, &FIELDS, Direction::Forward, Unmapped::Drop))
}

/// `FREQ=WEEKLY;BYDAY=MO` -> `weekly`
fn rrule_freq(rrule: &str) -> Option<String> {
    rrule
        .split(';')
        .find_map(|part| part.strip_prefix("FREQ="))
        .map(str::to_lowercase)
}

/// DTSTART/DTEND as a date or a wall-clock datetime.
fn to_value(prop: &Property) -> Option<Value> {
    let value = match DatePerhapsTime::try_from(prop).ok()? {
        DatePerhapsTime::Date(d) => Value::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Floating(naive) => Value::DateTime(naive),
            CalendarDateTime::Utc(dt) => Value::DateTime(dt.naive_utc()),
            CalendarDateTime::WithTimezone { date_time, .. } => Value::DateTime(date_time),
        },
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_event_fields() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:test-123\r\n\
SUMMARY:Team\\, offsite\r\n\
DTSTART:20240101T100000Z\r\n\
DTEND;TZID=Europe/Berlin:20240101T120000\r\n\
RRULE:FREQ=WEEKLY;BYDAY=MO\r\n\
CATEGORIES:work,travel\r\n\
LOCATION:Hello \r\n world\r\n\
ATTENDEE:mailto:a@example.com\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let records = parse_events(ics).expect("Should parse");
        assert_eq!(records.len(), 1);
        let event = &records[0];

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(event["summary"], [Value::from("Team, offsite")]);
        assert_eq!(event["dtstart"], [Value::DateTime(day.and_hms_opt(10, 0, 0).unwrap())]);
        assert_eq!(event["dtend"], [Value::DateTime(day.and_hms_opt(12, 0, 0).unwrap())]);
        assert_eq!(event["freq"], [Value::from("weekly")]);
        assert_eq!(event["tag"], [Value::from("work"), Value::from("travel")]);
        assert_eq!(event["location"], [Value::from("Hello world")]);
        assert!(!event.contains("attendee"));
        assert!(!event.contains("uid"));
    }

    #[test]
    fn test_all_day_event() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nSUMMARY:Birthday\r\n\
DTSTART;VALUE=DATE:19700101\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

        let records = parse_events(ics).unwrap();
        assert_eq!(
            records[0]["dtstart"],
            [Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())]
        );
    }

    #[test]
    fn test_event_with_bad_date_is_skipped() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\n\
BEGIN:VEVENT\r\nSUMMARY:broken\r\nDTSTART:tomorrow\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nSUMMARY:fine\r\nDTSTART;VALUE=DATE:20240101\r\nEND:VEVENT\r\n\
END:VCALENDAR\r\n";

        let records = parse_events(ics).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["summary"], [Value::from("fine")]);
    }

    #[test]
    fn test_text_is_unescaped_once() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\n\
SUMMARY:a\\\\,b\r\n\
DESCRIPTION:line1\\nline2 \\\\ back\r\n\
CATEGORIES;LANGUAGE=en:x\\,y,z\r\n\
CATEGORIES:w\r\n\
END:VEVENT\r\nEND:VCALENDAR\r\n";

        let records = parse_events(ics).unwrap();
        assert_eq!(records[0]["summary"], [Value::from("a\\,b")]);
        assert_eq!(records[0]["description"], [Value::from("line1\nline2 \\ back")]);
        assert_eq!(
            records[0]["tag"],
            [Value::from("x,y"), Value::from("z"), Value::from("w")]
        );
    }

    #[test]
    fn test_split_categories() {
        let text = "BEGIN:VEVENT\r\nCATEGORIES:a\\,b,c\r\nSUMMARY:x,y\r\nEND:VEVENT\r\n";
        assert_eq!(
            split_categories(text),
            "BEGIN:VEVENT\r\nCATEGORIES:a\\,b\r\nCATEGORIES:c\r\nSUMMARY:x,y\r\nEND:VEVENT\r\n"
        );
    }

    #[test]
    fn test_rrule_freq() {
        assert_eq!(rrule_freq("FREQ=YEARLY"), Some("yearly".to_string()));
        assert_eq!(rrule_freq("INTERVAL=2;FREQ=DAILY"), Some("daily".to_string()));
        assert_eq!(rrule_freq("COUNT=3"), None);
    }
}
