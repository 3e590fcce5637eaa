// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Jacoco XML report parsing.
//!
//! Only the report-level `<counter>` elements (direct children of the root
//! `<report>`) are read. Package, class and method counters nested deeper in
//! the document are skipped.

use std::collections::BTreeMap;

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use serde::Serialize;

use crate::error::Error;

const ROOT_ELEMENT: &[u8] = b"report";
const COUNTER_ELEMENT: &[u8] = b"counter";

/// Covered and missed units of one coverage dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize,)]
pub struct Counter
{
    /// Units exercised by the tests.
    pub covered: u64,
    /// Units never exercised.
    pub missed:  u64,
}

impl Counter
{
    /// Total number of units the counter describes.
    pub fn total(self,) -> u64
    {
        self.covered.saturating_add(self.missed,)
    }
}

/// Report-level counters indexed by Jacoco counter type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize,)]
#[serde(transparent)]
pub struct CoverageCounters
{
    counters: BTreeMap<String, Counter,>,
}

impl CoverageCounters
{
    /// Stores `counter` under `kind`, replacing an earlier entry.
    pub fn insert(&mut self, kind: impl Into<String,>, counter: Counter,)
    {
        self.counters.insert(kind.into(), counter,);
    }

    /// Looks up a counter by type name (e.g. `INSTRUCTION`).
    pub fn get(&self, kind: &str,) -> Option<Counter,>
    {
        self.counters.get(kind,).copied()
    }

    /// Number of distinct counter types.
    pub fn len(&self,) -> usize
    {
        self.counters.len()
    }

    /// Whether the report carried no report-level counters.
    pub fn is_empty(&self,) -> bool
    {
        self.counters.is_empty()
    }

    /// Iterates counters in type-name order.
    pub fn iter(&self,) -> impl Iterator<Item = (&str, Counter,),> + '_
    {
        self.counters.iter().map(|(kind, counter,)| (kind.as_str(), *counter,),)
    }
}

/// Parses a Jacoco XML report into its report-level counters.
///
/// Later counters of the same type overwrite earlier ones.
///
/// # Errors
///
/// Returns [`Error::ReportUnparseable`] when the bytes are not UTF-8, the XML
/// is malformed, the root element is not `<report>`, or a report-level
/// counter lacks a `type`, `covered` or `missed` attribute.
///
/// # Example
///
/// ```
/// let xml = br#"<report name="demo">
///   <counter type="INSTRUCTION" missed="20" covered="80"/>
/// </report>"#;
///
/// let counters = covbadge::parse_report(xml).expect("valid report");
/// assert_eq!(counters.get("INSTRUCTION").map(|c| c.covered), Some(80));
/// ```
pub fn parse_report(bytes: &[u8],) -> Result<CoverageCounters, Error,>
{
    let text = std::str::from_utf8(bytes,)
        .map_err(|error| Error::unparseable(format!("report is not valid UTF-8: {error}"),),)?;

    let mut reader = Reader::from_str(text,);
    let mut counters = CoverageCounters::default();
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        let event = match reader.read_event() {
            Ok(event,) => event,
            Err(error,) => {
                return Err(Error::unparseable(format!(
                    "malformed XML near byte {}: {error}",
                    reader.buffer_position()
                ),),);
            }
        };

        match event {
            Event::Start(element,) => {
                visit_element(&element, depth, &mut saw_root, &mut counters,)?;
                depth += 1;
            }
            Event::Empty(element,) => {
                visit_element(&element, depth, &mut saw_root, &mut counters,)?;
            }
            Event::End(_,) => {
                depth = depth.saturating_sub(1,);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(Error::unparseable("document has no <report> root element",),);
    }
    if depth != 0 {
        return Err(Error::unparseable("document ended before the <report> element was closed",),);
    }

    Ok(counters,)
}

fn visit_element(
    element: &BytesStart<'_,>,
    depth: usize,
    saw_root: &mut bool,
    counters: &mut CoverageCounters,
) -> Result<(), Error,>
{
    let name = element.name();
    if depth == 0 {
        if *saw_root {
            return Err(Error::unparseable("document has more than one root element",),);
        }
        if name.as_ref() != ROOT_ELEMENT {
            return Err(Error::unparseable(format!(
                "expected <report> root element, found <{}>",
                String::from_utf8_lossy(name.as_ref())
            ),),);
        }
        *saw_root = true;
    } else if depth == 1 && name.as_ref() == COUNTER_ELEMENT {
        let (kind, counter,) = read_counter(element,)?;
        counters.insert(kind, counter,);
    }
    Ok((),)
}

fn read_counter(element: &BytesStart<'_,>,) -> Result<(String, Counter,), Error,>
{
    let mut kind = None;
    let mut covered = None;
    let mut missed = None;

    for attribute in element.attributes() {
        let attribute = attribute
            .map_err(|error| Error::unparseable(format!("invalid counter attribute: {error}"),),)?;
        let value = attribute
            .unescape_value()
            .map_err(|error| Error::unparseable(format!("invalid counter attribute: {error}"),),)?;

        match attribute.key.as_ref() {
            b"type" => kind = Some(value.into_owned(),),
            b"covered" => covered = Some(parse_units("covered", &value,)?,),
            b"missed" => missed = Some(parse_units("missed", &value,)?,),
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| Error::unparseable("counter without a type attribute",),)?;
    let covered = covered
        .ok_or_else(|| Error::unparseable(format!("{kind} counter has no covered attribute"),),)?;
    let missed = missed
        .ok_or_else(|| Error::unparseable(format!("{kind} counter has no missed attribute"),),)?;

    Ok((
        kind,
        Counter {
            covered,
            missed,
        },
    ),)
}

fn parse_units(attribute: &str, value: &str,) -> Result<u64, Error,>
{
    value
        .trim()
        .parse::<u64,>()
        .map_err(|_| Error::unparseable(format!("{attribute}=\"{value}\" is not a non-negative integer"),),)
}
