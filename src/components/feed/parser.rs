use crate::utils::text::normalize_color;
use std::collections::HashMap;

/// Color properties recognised at calendar and event level, in priority order
const COLOR_PROPERTIES: [&str; 4] = [
    "COLOR",
    "X-APPLE-CALENDAR-COLOR",
    "X-OUTLOOK-COLOR",
    "X-FUNAMBOL-COLOR",
];

/// One `NAME;PARAM=VALUE:VALUE` content line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyLine {
    pub name: String,
    pub params: HashMap<String, String>,
    pub value: String,
}

impl PropertyLine {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Split a logical line into name, parameters and value.
///
/// Lines without a `:` are malformed and yield `None`.
pub fn parse_property_line(line: &str) -> Option<PropertyLine> {
    let (head, value) = line.split_once(':')?;
    let mut parts = head.trim().split(';');
    let name = parts.next()?.trim().to_ascii_uppercase();
    if name.is_empty() {
        return None;
    }

    let params = parts
        .filter_map(|part| part.split_once('='))
        .map(|(key, val)| {
            (
                key.trim().to_ascii_uppercase(),
                val.trim().trim_matches('"').to_string(),
            )
        })
        .collect();

    Some(PropertyLine {
        name,
        params,
        value: value.to_string(),
    })
}

/// Frozen property map of a single VEVENT
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPropertyBlock {
    props: HashMap<String, String>,
    exdates: Vec<(String, Option<String>)>,
}

impl RawPropertyBlock {
    /// Property value, last write wins. `<NAME>_TZID` keys hold TZID parameters.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.props.get(name).map(String::as_str)
    }

    /// Non-blank property value
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    pub fn tzid(&self, name: &str) -> Option<&str> {
        self.get(&format!("{name}_TZID"))
    }

    /// Every EXDATE line seen, with its TZID parameter
    pub fn exdates(&self) -> &[(String, Option<String>)] {
        &self.exdates
    }

    /// First recognised color property carried by the event itself
    pub fn color(&self) -> Option<&str> {
        COLOR_PROPERTIES.iter().find_map(|name| self.non_empty(name))
    }
}

/// Collects properties while a VEVENT is open
#[derive(Debug, Default)]
pub struct BlockBuilder {
    block: RawPropertyBlock,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, line: PropertyLine) {
        if let Some(tzid) = line.param("TZID") {
            self.block
                .props
                .insert(format!("{}_TZID", line.name), tzid.to_string());
        }
        if line.name == "EXDATE" {
            let tzid = line.param("TZID").map(str::to_string);
            self.block.exdates.push((line.value.clone(), tzid));
        }
        self.block.props.insert(line.name, line.value);
    }

    pub fn finish(self) -> RawPropertyBlock {
        self.block
    }
}

/// Calendar-wide properties found outside any VEVENT
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarMeta {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Result of scanning a whole feed
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub meta: CalendarMeta,
    pub blocks: Vec<RawPropertyBlock>,
    /// VEVENTs opened but never closed
    pub discarded: usize,
}

/// Scan unfolded lines into event blocks and calendar metadata
pub fn parse_feed<S: AsRef<str>>(lines: &[S]) -> ParsedFeed {
    let mut feed = ParsedFeed::default();
    let mut builder: Option<BlockBuilder> = None;
    // Components opened inside the current VEVENT (VALARM, ...)
    let mut nested_in_event = 0usize;
    // Components opened outside any VEVENT (VCALENDAR, VTIMEZONE, ...)
    let mut outer: Vec<String> = Vec::new();

    for line in lines {
        let Some(prop) = parse_property_line(line.as_ref()) else {
            continue;
        };
        let component = prop.value.trim().to_ascii_uppercase();

        match prop.name.as_str() {
            "BEGIN" if component == "VEVENT" && builder.is_none() => {
                builder = Some(BlockBuilder::new());
                nested_in_event = 0;
            }
            "BEGIN" if component == "VEVENT" => {
                // A new VEVENT before the previous one ended: the open one is incomplete
                feed.discarded += 1;
                builder = Some(BlockBuilder::new());
                nested_in_event = 0;
            }
            "END" if component == "VEVENT" && nested_in_event == 0 => {
                if let Some(done) = builder.take() {
                    feed.blocks.push(done.finish());
                }
            }
            "BEGIN" if builder.is_some() => nested_in_event += 1,
            "END" if builder.is_some() => nested_in_event = nested_in_event.saturating_sub(1),
            "BEGIN" => outer.push(component),
            "END" => {
                outer.pop();
            }
            _ => {
                if let Some(current) = builder.as_mut() {
                    if nested_in_event == 0 {
                        current.set(prop);
                    }
                } else if outer.len() <= 1 {
                    record_calendar_property(&mut feed.meta, &prop);
                }
            }
        }
    }

    if builder.is_some() {
        feed.discarded += 1;
    }

    feed
}

fn record_calendar_property(meta: &mut CalendarMeta, prop: &PropertyLine) {
    if prop.name == "X-WR-CALNAME" || prop.name == "NAME" {
        let name = prop.value.trim();
        if meta.name.is_none() && !name.is_empty() {
            meta.name = Some(name.to_string());
        }
    } else if meta.color.is_none() && COLOR_PROPERTIES.contains(&prop.name.as_str()) {
        meta.color = normalize_color(&prop.value);
    }
}
