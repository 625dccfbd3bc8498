//! EPUB Canonical Fragment Identifiers.
//!
//! [`PaginatedBook`](crate::PaginatedBook) issues its positions in the CFI
//! syntax used by EPUB reading systems:
//!
//! ```text
//! epubcfi(/6/8[ch03]!/4/2/1:12)          point: 13th char of a text node
//! epubcfi(/6/8[ch03]!/4/2,/1:0,/1:5)      range: chars 0..5 of that node
//! ```
//!
//! The part before `!` selects the spine item (`/6` is the package spine,
//! `/8` its fourth item). The part after it walks the content document from
//! the root element: element children take even step numbers `2, 4, 6, ..`
//! and the text between them takes the odd number of the gap. Because steps
//! follow document order, comparing two identifiers is a lexicographic walk
//! and never needs the document.
//!
//! Only the subset produced by this crate is supported: no spatial or
//! temporal offsets, no side bias, no indirection beyond the spine.

use std::cmp::Ordering;
use std::fmt;

use crate::dom::{ArenaDom, NodeId};
use crate::error::EngineError;
use crate::position::Pid;

/// One end of a CFI: a content path plus an optional character offset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CfiPoint {
    pub steps: Vec<u32>,
    pub offset: Option<usize>,
}

impl CfiPoint {
    pub fn new(steps: Vec<u32>, offset: Option<usize>) -> Self {
        Self { steps, offset }
    }

    /// Document order of two points. A missing offset counts as zero and a
    /// path sorts before the paths it prefixes.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.steps
            .cmp(&other.steps)
            .then_with(|| self.offset.unwrap_or(0).cmp(&other.offset.unwrap_or(0)))
    }
}

/// A parsed `epubcfi(...)` point or range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cfi {
    /// Zero-based spine position.
    pub spine_index: usize,
    /// Id assertion on the spine step.
    pub idref: Option<String>,
    pub start: CfiPoint,
    /// End of a range; `None` for a point.
    pub end: Option<CfiPoint>,
}

impl Cfi {
    pub fn point(spine_index: usize, idref: Option<String>, point: CfiPoint) -> Self {
        Self {
            spine_index,
            idref,
            start: point,
            end: None,
        }
    }

    pub fn range(
        spine_index: usize,
        idref: Option<String>,
        start: CfiPoint,
        end: CfiPoint,
    ) -> Self {
        Self {
            spine_index,
            idref,
            start,
            end: Some(end),
        }
    }

    pub fn is_range(&self) -> bool {
        self.end.is_some()
    }

    /// Reading order: spine item first, then the start point. Ranges order
    /// by where they begin.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.spine_index
            .cmp(&other.spine_index)
            .then_with(|| self.start.compare(&other.start))
    }

    pub fn to_pid(&self) -> Pid {
        Pid::new(self.to_string())
    }

    pub fn from_pid(pid: &Pid) -> Result<Self, EngineError> {
        Self::parse(pid.as_str())
    }

    pub fn parse(input: &str) -> Result<Self, EngineError> {
        let invalid = |why: &str| EngineError::InvalidPosition(format!("{input:?}: {why}"));

        let body = input
            .trim()
            .strip_prefix("epubcfi(")
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| invalid("expected epubcfi(...)"))?;
        let (package, content) = body
            .split_once('!')
            .ok_or_else(|| invalid("missing spine indirection"))?;

        let package = parse_path(package).map_err(|e| invalid(e))?;
        let (spine_index, idref) = match package.steps.as_slice() {
            [(6, _), (item, idref)] if *item >= 2 && item % 2 == 0 && package.offset.is_none() => {
                ((*item / 2 - 1) as usize, idref.clone())
            }
            _ => return Err(invalid("spine path must look like /6/<even>")),
        };

        let parts: Vec<&str> = content.split(',').collect();
        match parts.as_slice() {
            [path] => {
                let point = parse_path(path).map_err(|e| invalid(e))?;
                Ok(Self::point(spine_index, idref, point.into_point()))
            }
            [base, start, end] => {
                let base = parse_path(base).map_err(|e| invalid(e))?;
                if base.offset.is_some() {
                    return Err(invalid("range base cannot carry an offset"));
                }
                let start = parse_path(start).map_err(|e| invalid(e))?;
                let end = parse_path(end).map_err(|e| invalid(e))?;
                if start.steps.is_empty() || end.steps.is_empty() {
                    return Err(invalid("empty range end"));
                }
                let base = base.into_point().steps;
                let join = |local: ParsedPath| {
                    let local = local.into_point();
                    let mut steps = base.clone();
                    steps.extend(local.steps);
                    CfiPoint::new(steps, local.offset)
                };
                Ok(Self::range(spine_index, idref, join(start), join(end)))
            }
            _ => Err(invalid("expected a point or a three-part range")),
        }
    }
}

impl fmt::Display for Cfi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epubcfi(/6/{}", (self.spine_index + 1) * 2)?;
        if let Some(idref) = &self.idref {
            write!(f, "[{idref}]")?;
        }
        f.write_str("!")?;

        match &self.end {
            None => write_point(f, &self.start.steps, self.start.offset)?,
            Some(end) => {
                // Both local paths keep at least their last step.
                let limit = self.start.steps.len().min(end.steps.len()).saturating_sub(1);
                let common = self
                    .start
                    .steps
                    .iter()
                    .zip(&end.steps)
                    .take(limit)
                    .take_while(|(a, b)| a == b)
                    .count();
                write_point(f, &self.start.steps[..common], None)?;
                f.write_str(",")?;
                write_point(f, &self.start.steps[common..], self.start.offset)?;
                f.write_str(",")?;
                write_point(f, &end.steps[common..], end.offset)?;
            }
        }
        f.write_str(")")
    }
}

fn write_point(f: &mut fmt::Formatter<'_>, steps: &[u32], offset: Option<usize>) -> fmt::Result {
    for step in steps {
        write!(f, "/{step}")?;
    }
    if let Some(offset) = offset {
        write!(f, ":{offset}")?;
    }
    Ok(())
}

struct ParsedPath {
    steps: Vec<(u32, Option<String>)>,
    offset: Option<usize>,
}

impl ParsedPath {
    fn into_point(self) -> CfiPoint {
        CfiPoint::new(self.steps.into_iter().map(|(n, _)| n).collect(), self.offset)
    }
}

fn parse_path(path: &str) -> Result<ParsedPath, &'static str> {
    let mut parsed = ParsedPath {
        steps: Vec::new(),
        offset: None,
    };
    if path.is_empty() {
        return Ok(parsed);
    }
    let rest = path.strip_prefix('/').ok_or("steps must start with '/'")?;

    let segments: Vec<&str> = rest.split('/').collect();
    let last = segments.len() - 1;
    for (i, segment) in segments.into_iter().enumerate() {
        let (step, offset) = match segment.split_once(':') {
            Some(_) if i != last => return Err("offset before the final step"),
            Some((step, offset)) => (step, Some(offset)),
            None => (segment, None),
        };

        let (number, assertion) = split_assertion(step)?;
        let number: u32 = number.parse().map_err(|_| "step is not a number")?;
        if number == 0 {
            return Err("step numbers start at 1");
        }
        parsed.steps.push((number, assertion));

        if let Some(offset) = offset {
            let (offset, _) = split_assertion(offset)?;
            parsed.offset = Some(offset.parse().map_err(|_| "offset is not a number")?);
        }
    }
    Ok(parsed)
}

/// Split `4[chap01]` into `("4", Some("chap01"))`.
fn split_assertion(token: &str) -> Result<(&str, Option<String>), &'static str> {
    match token.split_once('[') {
        None if token.contains(['~', '@']) => Err("spatial and temporal offsets are unsupported"),
        None => Ok((token, None)),
        Some((head, tail)) => {
            let assertion = tail.strip_suffix(']').ok_or("unterminated assertion")?;
            Ok((head, Some(assertion.replace('^', ""))))
        }
    }
}

/// Content steps from the root element down to `node`.
///
/// Returns `None` for nodes outside the root element.
pub fn node_steps(dom: &ArenaDom, node: NodeId) -> Option<Vec<u32>> {
    let root = dom.document_element()?;
    let mut steps = Vec::new();
    let mut current = node;
    while current != root {
        let parent = dom.parent(current)?;
        steps.push(child_step(dom, parent, current)?);
        current = parent;
    }
    steps.reverse();
    Some(steps)
}

fn child_step(dom: &ArenaDom, parent: NodeId, node: NodeId) -> Option<u32> {
    let mut elements = 0u32;
    for child in dom.children(parent) {
        if child == node {
            return Some(if dom.is_element(node) {
                2 * (elements + 1)
            } else {
                2 * elements + 1
            });
        }
        if dom.is_element(child) {
            elements += 1;
        }
    }
    None
}

/// Follow content steps from the root element.
pub fn resolve_steps(dom: &ArenaDom, steps: &[u32]) -> Option<NodeId> {
    let mut current = dom.document_element()?;
    for &step in steps {
        current = if step % 2 == 0 {
            dom.children(current)
                .filter(|&c| dom.is_element(c))
                .nth((step / 2 - 1) as usize)?
        } else {
            let gap = (step - 1) / 2;
            let mut elements = 0;
            dom.children(current).find(|&c| {
                if dom.is_element(c) {
                    elements += 1;
                    false
                } else {
                    elements == gap && dom.is_text(c)
                }
            })?
        };
    }
    Some(current)
}
