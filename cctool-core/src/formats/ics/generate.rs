//! ICS file generation.

use icalendar::{Calendar, Component, Property, ValueType};
use log::warn;
use uuid::Uuid;

use super::FIELDS;
use crate::multidict::Record;
use crate::remap::{Direction, Unmapped, map_keys};
use crate::value::Value;

const PRODID: &str = "-//XI//NONSGML CCTOOL//";

/// Generate one calendar with a VEVENT per record.
pub fn generate_ics(records: &[Record]) -> String {
    let mut cal = Calendar::new();

    for record in records {
        let event = map_keys(record, &FIELDS, Direction::Reverse, Unmapped::Drop);

        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&Uuid::new_v4().to_string());

        for (key, values) in event.iter() {
            let name = key.to_uppercase();
            match key {
                "freq" => {
                    let freq = values[0].to_string().to_uppercase();
                    ics_event.add_property("RRULE", format!("FREQ={freq}"));
                }
                "dtstart" | "dtend" => add_datetime_property(&mut ics_event, &name, &values[0]),
                _ => {
                    for value in values {
                        ics_event.append_multi_property(Property::new(&name, value.to_string()));
                    }
                }
            }
        }

        cal.push(ics_event.done());
    }

    strip_ics_bloat(&cal.done().to_string())
}

/// Dates get `VALUE=DATE`, datetimes are written as floating local times.
fn add_datetime_property(ics_event: &mut icalendar::Event, name: &str, value: &Value) {
    match value {
        Value::Date(d) => {
            let mut prop = Property::new(name, d.format("%Y%m%d").to_string());
            prop.append_parameter(ValueType::Date);
            ics_event.append_property(prop);
        }
        Value::DateTime(dt) => {
            ics_event.add_property(name, dt.format("%Y%m%dT%H%M%S").to_string());
        }
        other => warn!("ics: dropping {name} '{other}', not a date"),
    }
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID with ours
/// - Remove CALSCALE:GREGORIAN (it's the default)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}
