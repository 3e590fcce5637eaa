// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::fmt::Write;

use covbadge::{BadgeKind, BadgeSpec, ColorBand, parse_report, render_badge};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

const SMALL_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<report name="widget">
  <sessioninfo id="ci" start="1" dump="2"/>
  <counter type="INSTRUCTION" missed="20" covered="80"/>
  <counter type="BRANCH" missed="1" covered="3"/>
  <counter type="LINE" missed="4" covered="16"/>
  <counter type="COMPLEXITY" missed="6" covered="8"/>
  <counter type="METHOD" missed="0" covered="2"/>
  <counter type="CLASS" missed="0" covered="1"/>
</report>"#;

/// Report with `packages` nested packages, each holding classes with their
/// own counters, shaped like real Jacoco output.
fn large_report(packages: usize,) -> String
{
    let mut xml = String::from("<report name=\"large\">",);
    for package in 0..packages {
        let _ = write!(xml, "<package name=\"com/example/p{package}\">");
        for class in 0..20 {
            let _ = write!(
                xml,
                "<class name=\"com/example/p{package}/C{class}\"><method name=\"run\" desc=\"()V\" \
                 line=\"{class}\"><counter type=\"INSTRUCTION\" missed=\"3\" covered=\"9\"/></method>\
                 <counter type=\"INSTRUCTION\" missed=\"3\" covered=\"9\"/></class>"
            );
        }
        xml.push_str("<counter type=\"INSTRUCTION\" missed=\"60\" covered=\"180\"/></package>",);
    }
    xml.push_str(
        "<counter type=\"INSTRUCTION\" missed=\"600\" covered=\"1800\"/><counter type=\"BRANCH\" \
         missed=\"10\" covered=\"30\"/></report>",
    );
    xml
}

fn benchmark_parse_report(c: &mut Criterion,)
{
    c.bench_function("parse_report_small", |b| {
        b.iter(|| parse_report(black_box(SMALL_REPORT.as_bytes(),),).expect("parse failed",),)
    },);

    let large = large_report(50,);
    c.bench_function("parse_report_large", |b| {
        b.iter(|| parse_report(black_box(large.as_bytes(),),).expect("parse failed",),)
    },);
}

fn benchmark_render_badge(c: &mut Criterion,)
{
    let coverage = BadgeSpec::new(BadgeKind::Line, "80%", ColorBand::Green,);
    c.bench_function("render_coverage_badge", |b| {
        b.iter(|| render_badge(black_box(&coverage,),).expect("render failed",),)
    },);

    let complexity = BadgeSpec::new(BadgeKind::Complexity, "12.5", ColorBand::Orange,);
    c.bench_function("render_complexity_badge", |b| {
        b.iter(|| render_badge(black_box(&complexity,),).expect("render failed",),)
    },);
}

criterion_group!(benches, benchmark_parse_report, benchmark_render_badge);
criterion_main!(benches);
