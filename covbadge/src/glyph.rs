// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Embedded bitmap face used for badge text.
//!
//! Glyphs are hand-drawn on a 9-row grid: rows 0..=6 sit above the baseline,
//! rows 7 and 8 hold descenders. A `#` is an inked pixel. Drawing never
//! blends, so output is bit-exact on every platform.

use image::{Rgba, RgbaImage};

/// Rows in a glyph cell.
pub const CELL_HEIGHT: usize = 9;

/// Stroke weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum Weight
{
    /// Single stroke, used for labels and metric values.
    SemiBold,
    /// Doubled stroke, used for error glyphs.
    Bold,
}

impl Weight
{
    fn extra_columns(self,) -> u32
    {
        match self {
            Self::SemiBold => 0,
            Self::Bold => 1,
        }
    }
}

const SPACE: &[&str] = &["..."];
const FALLBACK: &[&str] = &[".###.", "#...#", "....#", "...#.", "..#..", ".....", "..#.."];

fn rows(character: char,) -> &'static [&'static str]
{
    match character {
        '0' => &[".###.", "#...#", "#..##", "#.#.#", "##..#", "#...#", ".###."],
        '1' => &["..#..", ".##..", "..#..", "..#..", "..#..", "..#..", ".###."],
        '2' => &[".###.", "#...#", "....#", "...#.", "..#..", ".#...", "#####"],
        '3' => &["#####", "...#.", "..#..", "...#.", "....#", "#...#", ".###."],
        '4' => &["...#.", "..##.", ".#.#.", "#..#.", "#####", "...#.", "...#."],
        '5' => &["#####", "#....", "####.", "....#", "....#", "#...#", ".###."],
        '6' => &["..##.", ".#...", "#....", "####.", "#...#", "#...#", ".###."],
        '7' => &["#####", "....#", "...#.", "..#..", ".#...", ".#...", ".#..."],
        '8' => &[".###.", "#...#", "#...#", ".###.", "#...#", "#...#", ".###."],
        '9' => &[".###.", "#...#", "#...#", ".####", "....#", "...#.", ".##.."],
        '%' => &["##...", "##..#", "...#.", "..#..", ".#...", "#..##", "...##"],
        '.' => &["..", "..", "..", "..", "..", "##", "##"],
        '!' => &["#", "#", "#", "#", "#", ".", "#"],
        '?' => FALLBACK,
        ' ' => SPACE,
        'a' => &[".....", ".....", ".###.", "....#", ".####", "#...#", ".####"],
        'b' => &["#....", "#....", "####.", "#...#", "#...#", "#...#", "####."],
        'c' => &[".....", ".....", ".###.", "#....", "#....", "#...#", ".###."],
        'e' => &[".....", ".....", ".###.", "#...#", "#####", "#....", ".###."],
        'g' => &[
            ".....", ".....", ".####", "#...#", "#...#", ".####", "....#", "#...#", ".###.",
        ],
        'h' => &["#....", "#....", "#.##.", "##..#", "#...#", "#...#", "#...#"],
        'i' => &[".#.", "...", "##.", ".#.", ".#.", ".#.", "###"],
        'l' => &["##.", ".#.", ".#.", ".#.", ".#.", ".#.", "###"],
        'm' => &[".....", ".....", "##.#.", "#.#.#", "#.#.#", "#.#.#", "#.#.#"],
        'n' => &[".....", ".....", "#.##.", "##..#", "#...#", "#...#", "#...#"],
        'o' => &[".....", ".....", ".###.", "#...#", "#...#", "#...#", ".###."],
        'p' => &[
            ".....", ".....", "####.", "#...#", "#...#", "####.", "#....", "#....", "#....",
        ],
        'r' => &[".....", ".....", "#.##.", "##..#", "#....", "#....", "#...."],
        't' => &[".#...", ".#...", "####.", ".#...", ".#...", ".#..#", "..##."],
        'v' => &[".....", ".....", "#...#", "#...#", "#...#", ".#.#.", "..#.."],
        'x' => &[".....", ".....", "#...#", ".#.#.", "..#..", ".#.#.", "#...#"],
        'y' => &[
            ".....", ".....", "#...#", "#...#", "#...#", ".####", "....#", "#...#", ".###.",
        ],
        _ => FALLBACK,
    }
}

fn glyph_width(character: char, weight: Weight,) -> u32
{
    let columns = rows(character,).first().map_or(0, |row| row.len(),);
    columns as u32 + weight.extra_columns()
}

/// Horizontal pixels `text` occupies, without trailing spacing.
pub fn text_width(text: &str, weight: Weight,) -> u32
{
    let advance: u32 = text.chars().map(|character| glyph_width(character, weight,) + 1,).sum();
    advance.saturating_sub(1,)
}

/// Draws `text` with its cell top-left at (`x`, `y`), clipping at the edges.
pub fn draw_text(canvas: &mut RgbaImage, text: &str, x: i32, y: i32, weight: Weight, color: Rgba<u8,>,)
{
    let mut cursor = x;
    for character in text.chars() {
        draw_glyph(canvas, rows(character,), cursor, y, weight, color,);
        cursor += glyph_width(character, weight,) as i32 + 1;
    }
}

fn draw_glyph(
    canvas: &mut RgbaImage,
    glyph: &[&str],
    x: i32,
    y: i32,
    weight: Weight,
    color: Rgba<u8,>,
)
{
    for (row_index, row,) in glyph.iter().take(CELL_HEIGHT,).enumerate() {
        for (column, cell,) in row.bytes().enumerate() {
            if cell != b'#' {
                continue;
            }
            let px = x + column as i32;
            let py = y + row_index as i32;
            put(canvas, px, py, color,);
            if weight == Weight::Bold {
                put(canvas, px + 1, py, color,);
            }
        }
    }
}

fn put(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8,>,)
{
    if x < 0 || y < 0 {
        return;
    }
    let (x, y,) = (x as u32, y as u32,);
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, color,);
    }
}
