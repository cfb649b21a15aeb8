//! Random string generation from a regex, used to probe pattern inclusion.
//!
//! The pattern is parsed with `regex-syntax` into its high-level IR and
//! walked with an RNG. Look-around assertions (`^`, `$`, `\b`) produce no
//! output, so callers must re-check samples against the compiled regex.

use rand::Rng;
use regex_syntax::hir::{Class, ClassBytes, ClassUnicode, Hir, HirKind};

/// Printable ASCII, preferred when a class allows it.
const PRINTABLE: (u32, u32) = (0x20, 0x7E);

#[derive(Debug)]
pub struct Sampler {
    hir: Hir,
    max_repeat: u32,
    max_len: usize,
}

impl Sampler {
    /// Parses `pattern`; `None` when it is not valid regex syntax.
    #[must_use]
    pub fn new(pattern: &str, max_repeat: u32, max_len: usize) -> Option<Self> {
        let hir = regex_syntax::parse(pattern).ok()?;
        Some(Sampler {
            hir,
            max_repeat,
            max_len,
        })
    }

    /// Draws one candidate, or `None` when it exceeds the length cap.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        let mut out = String::new();
        self.emit(&self.hir, rng, &mut out);
        (out.chars().count() <= self.max_len).then_some(out)
    }

    fn emit<R: Rng + ?Sized>(&self, hir: &Hir, rng: &mut R, out: &mut String) {
        // Runaway output is discarded by the length cap anyway.
        if out.len() > self.max_len.saturating_mul(4) {
            return;
        }
        match hir.kind() {
            HirKind::Empty | HirKind::Look(_) => {}
            HirKind::Literal(lit) => out.push_str(&String::from_utf8_lossy(&lit.0)),
            HirKind::Class(Class::Unicode(class)) => {
                if let Some(c) = pick_unicode(class, rng) {
                    out.push(c);
                }
            }
            HirKind::Class(Class::Bytes(class)) => {
                if let Some(c) = pick_byte(class, rng) {
                    out.push(c);
                }
            }
            HirKind::Repetition(rep) => {
                let cap = rep.min.saturating_add(self.max_repeat);
                let hi = rep.max.map_or(cap, |max| max.min(cap));
                let count = rng.gen_range(rep.min..=hi.max(rep.min));
                for _ in 0..count {
                    self.emit(&rep.sub, rng, out);
                }
            }
            HirKind::Capture(capture) => self.emit(&capture.sub, rng, out),
            HirKind::Concat(parts) => {
                for part in parts {
                    self.emit(part, rng, out);
                }
            }
            HirKind::Alternation(alternatives) => {
                let pick = rng.gen_range(0..alternatives.len());
                if let Some(alternative) = alternatives.get(pick) {
                    self.emit(alternative, rng, out);
                }
            }
        }
    }
}

/// Clips `(start, end)` ranges to printable ASCII, falling back to the full
/// ranges when nothing printable is left.
fn preferred_ranges(ranges: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    let printable: Vec<(u32, u32)> = ranges
        .iter()
        .filter_map(|&(start, end)| {
            let lo = start.max(PRINTABLE.0);
            let hi = end.min(PRINTABLE.1);
            (lo <= hi).then_some((lo, hi))
        })
        .collect();
    if printable.is_empty() { ranges } else { printable }
}

fn pick_code_point<R: Rng + ?Sized>(ranges: &[(u32, u32)], rng: &mut R) -> Option<u32> {
    let total: u64 = ranges
        .iter()
        .map(|&(start, end)| u64::from(end - start) + 1)
        .sum();
    if total == 0 {
        return None;
    }
    let mut offset = rng.gen_range(0..total);
    for &(start, end) in ranges {
        let width = u64::from(end - start) + 1;
        if offset < width {
            return u32::try_from(offset).ok().map(|o| start + o);
        }
        offset -= width;
    }
    None
}

fn pick_unicode<R: Rng + ?Sized>(class: &ClassUnicode, rng: &mut R) -> Option<char> {
    let ranges = preferred_ranges(
        class
            .ranges()
            .iter()
            .map(|r| (u32::from(r.start()), u32::from(r.end())))
            .collect(),
    );
    // Surrogate gaps inside wide ranges are retried a few times.
    (0..8).find_map(|_| pick_code_point(&ranges, rng).and_then(char::from_u32))
}

fn pick_byte<R: Rng + ?Sized>(class: &ClassBytes, rng: &mut R) -> Option<char> {
    let ranges = preferred_ranges(
        class
            .ranges()
            .iter()
            .map(|r| (u32::from(r.start()), u32::from(r.end())))
            .collect(),
    );
    pick_code_point(&ranges, rng)
        .and_then(|b| u8::try_from(b).ok())
        .filter(u8::is_ascii)
        .map(char::from)
}
