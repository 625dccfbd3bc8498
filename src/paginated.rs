//! A reference rendering engine.
//!
//! [`PaginatedBook`] implements [`RenderingEngine`] without any layout: each
//! section's body text is cut into pages of a fixed number of characters and
//! every position is an EPUB CFI. It exists so the synchronizer can run end to
//! end (the `readsync` binary, the test suite, benchmarks); a host embedding a
//! real renderer implements the trait over that renderer instead.

use std::cmp::Ordering;

use crate::cfi::{self, Cfi, CfiPoint};
use crate::config::ReaderConfig;
use crate::dom::{self, ArenaDom, NodeId};
use crate::engine::{RenderingEngine, Section};
use crate::error::EngineError;
use crate::position::{Pid, Relocation};

/// A contiguous run of section text backed by one text node.
#[derive(Debug, Clone, Copy)]
struct TextRun {
    node: NodeId,
    /// Character offset of the run within the section.
    start: usize,
    /// Length in characters; never zero.
    len: usize,
}

/// One parsed content document plus its text layout.
pub struct SectionContent {
    section: Section,
    dom: ArenaDom,
    runs: Vec<TextRun>,
    char_len: usize,
}

impl SectionContent {
    pub fn new(href: impl Into<String>, idref: Option<String>, dom: ArenaDom) -> Self {
        let mut runs = Vec::new();
        let mut offset = 0;
        if let Some(body) = dom.body() {
            for (node, text) in dom.text_nodes(body) {
                let len = text.chars().count();
                if len > 0 {
                    runs.push(TextRun {
                        node,
                        start: offset,
                        len,
                    });
                    offset += len;
                }
            }
        }

        Self {
            section: Section {
                index: 0,
                href: href.into(),
                idref,
            },
            dom,
            runs,
            char_len: offset,
        }
    }

    pub fn from_html(href: impl Into<String>, html: &str) -> Self {
        Self::new(href, None, dom::parse_html(html))
    }

    pub fn section(&self) -> &Section {
        &self.section
    }

    pub fn dom(&self) -> &ArenaDom {
        &self.dom
    }

    /// Number of body characters.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// CFI point addressing the character at `offset`.
    ///
    /// `offset == char_len` addresses the end of the last run. A section
    /// without text is addressed by its body element.
    fn point_at(&self, offset: usize) -> CfiPoint {
        let idx = self.runs.partition_point(|r| r.start + r.len <= offset);
        let (run, local) = match self.runs.get(idx) {
            Some(run) => (run, offset - run.start),
            None => match self.runs.last() {
                Some(run) => (run, run.len),
                None => {
                    let steps = self
                        .dom
                        .body()
                        .and_then(|body| cfi::node_steps(&self.dom, body))
                        .unwrap_or_default();
                    return CfiPoint::new(steps, None);
                }
            },
        };
        let steps = cfi::node_steps(&self.dom, run.node).unwrap_or_default();
        CfiPoint::new(steps, Some(local))
    }

    /// Last node of the body in document order, as a page end.
    ///
    /// Elements after the final character (a closing image, an empty
    /// section's only illustration) still belong to the last page, so its
    /// end must not sort before them.
    fn end_point(&self) -> CfiPoint {
        let Some(body) = self.dom.body() else {
            return CfiPoint::default();
        };
        let last = self.dom.descendants(body).last().unwrap_or(body);
        let steps = cfi::node_steps(&self.dom, last).unwrap_or_default();
        let offset = self
            .dom
            .text(last)
            .map(|text| text.chars().count().saturating_sub(1));
        CfiPoint::new(steps, offset)
    }

    /// Characters of body text preceding `point`.
    fn char_offset_of(&self, point: &CfiPoint) -> Result<usize, EngineError> {
        let node = cfi::resolve_steps(&self.dom, &point.steps).ok_or_else(|| {
            EngineError::InvalidPosition(format!(
                "path {:?} does not exist in {}",
                point.steps, self.section.href
            ))
        })?;

        if let Some(run) = self.runs.iter().find(|r| r.node == node) {
            return Ok(run.start + point.offset.unwrap_or(0).min(run.len));
        }

        // An element (or an empty text node): count the text before it.
        let Some(body) = self.dom.body() else {
            return Ok(0);
        };
        let mut offset = 0;
        for id in self.dom.descendants(body) {
            if id == node {
                return Ok(offset);
            }
            if let Some(text) = self.dom.text(id) {
                offset += text.chars().count();
            }
        }
        Ok(0)
    }

    fn cfi(&self, point: CfiPoint) -> Cfi {
        Cfi::point(self.section.index, self.section.idref.clone(), point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    section: usize,
    page: usize,
}

/// Character-paginated book implementing [`RenderingEngine`].
///
/// ```
/// use readsync::{PaginatedBook, ReaderConfig, RenderingEngine};
///
/// let config = ReaderConfig::new().with_chars_per_page(5);
/// let mut book = PaginatedBook::from_html(
///     [("ch1.xhtml", "<h1>Hello world</h1>")],
///     &config,
/// );
/// let first = book.display(0).unwrap();
/// assert_eq!(book.page_count(0), Some(3));
/// let second = book.next_page().unwrap();
/// assert_eq!(book.compare(&first.end, &second.start).unwrap(), std::cmp::Ordering::Less);
/// ```
pub struct PaginatedBook {
    sections: Vec<SectionContent>,
    /// Characters before each section.
    section_offsets: Vec<usize>,
    total_chars: usize,
    chars_per_page: usize,
    cursor: Option<Cursor>,
}

impl PaginatedBook {
    pub fn new(mut sections: Vec<SectionContent>, config: &ReaderConfig) -> Self {
        let mut section_offsets = Vec::with_capacity(sections.len());
        let mut total_chars = 0;
        for (index, content) in sections.iter_mut().enumerate() {
            content.section.index = index;
            section_offsets.push(total_chars);
            total_chars += content.char_len;
        }

        Self {
            sections,
            section_offsets,
            total_chars,
            chars_per_page: config.chars_per_page.max(1),
            cursor: None,
        }
    }

    /// Build a book from `(href, html)` pairs in reading order.
    pub fn from_html<I, H, S>(documents: I, config: &ReaderConfig) -> Self
    where
        I: IntoIterator<Item = (H, S)>,
        H: Into<String>,
        S: AsRef<str>,
    {
        let sections = documents
            .into_iter()
            .map(|(href, html)| SectionContent::from_html(href, html.as_ref()))
            .collect();
        Self::new(sections, config)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().map(|s| &s.section)
    }

    pub fn chars_per_page(&self) -> usize {
        self.chars_per_page
    }

    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    pub fn page_count(&self, section: usize) -> Option<usize> {
        let content = self.sections.get(section)?;
        Some(content.char_len.div_ceil(self.chars_per_page).max(1))
    }

    /// Show the first page of `section`.
    pub fn display(&mut self, section: usize) -> Result<Relocation, EngineError> {
        self.show(Cursor { section, page: 0 })
    }

    /// Show the page containing `position`.
    pub fn display_position(&mut self, position: &Pid) -> Result<Relocation, EngineError> {
        let cfi = Cfi::from_pid(position)?;
        let content = self.content(cfi.spine_index)?;
        let offset = content.char_offset_of(&cfi.start)?;
        let last_page = content.char_len.div_ceil(self.chars_per_page).max(1) - 1;
        let page = (offset / self.chars_per_page).min(last_page);
        self.show(Cursor {
            section: cfi.spine_index,
            page,
        })
    }

    /// Turn forward, crossing into the next section after its last page.
    /// Returns `None` at the end of the book or when nothing is displayed.
    pub fn next_page(&mut self) -> Option<Relocation> {
        let Cursor { section, page } = self.cursor?;
        let next = if page + 1 < self.page_count(section)? {
            Cursor {
                section,
                page: page + 1,
            }
        } else if section + 1 < self.sections.len() {
            Cursor {
                section: section + 1,
                page: 0,
            }
        } else {
            return None;
        };
        self.show(next).ok()
    }

    /// Turn backward, landing on the last page of the previous section.
    pub fn prev_page(&mut self) -> Option<Relocation> {
        let Cursor { section, page } = self.cursor?;
        let prev = if page > 0 {
            Cursor {
                section,
                page: page - 1,
            }
        } else if section > 0 {
            Cursor {
                section: section - 1,
                page: self.page_count(section - 1)? - 1,
            }
        } else {
            return None;
        };
        self.show(prev).ok()
    }

    fn show(&mut self, cursor: Cursor) -> Result<Relocation, EngineError> {
        let pages = self
            .page_count(cursor.section)
            .ok_or(EngineError::SectionOutOfRange(cursor.section))?;
        let cursor = Cursor {
            section: cursor.section,
            page: cursor.page.min(pages - 1),
        };
        self.cursor = Some(cursor);
        let location = self.location_at(cursor)?;
        log::debug!(
            "displaying section {} page {}/{} ({}..{})",
            cursor.section,
            cursor.page + 1,
            pages,
            location.start,
            location.end
        );
        Ok(location)
    }

    fn location_at(&self, cursor: Cursor) -> Result<Relocation, EngineError> {
        let content = self.content(cursor.section)?;
        let first = cursor.page * self.chars_per_page;
        let past_last = (cursor.page + 1) * self.chars_per_page;
        // The end position addresses the last visible character itself.
        let end = if past_last >= content.char_len {
            content.end_point()
        } else {
            content.point_at(past_last - 1)
        };

        Ok(Relocation {
            start: content.cfi(content.point_at(first)).to_pid(),
            end: content.cfi(end).to_pid(),
            section_index: cursor.section,
        })
    }

    fn content(&self, index: usize) -> Result<&SectionContent, EngineError> {
        self.sections
            .get(index)
            .ok_or(EngineError::SectionOutOfRange(index))
    }

    fn checked_node(
        &self,
        section: &Section,
        node: NodeId,
    ) -> Result<&SectionContent, EngineError> {
        let content = self.content(section.index)?;
        if content.dom.is_element(node) || content.dom.is_text(node) {
            Ok(content)
        } else {
            Err(EngineError::NodeNotFound)
        }
    }
}

impl RenderingEngine for PaginatedBook {
    fn current_location(&self) -> Result<Relocation, EngineError> {
        let cursor = self.cursor.ok_or(EngineError::NotDisplayed)?;
        self.location_at(cursor)
    }

    fn percentage_from_position(&self, position: &Pid) -> Result<f64, EngineError> {
        let cfi = Cfi::from_pid(position)?;
        let content = self.content(cfi.spine_index)?;
        let offset = content.char_offset_of(&cfi.start)?;
        if self.total_chars == 0 {
            return Ok(0.0);
        }
        let before = self.section_offsets[cfi.spine_index] + offset;
        Ok((before as f64 / self.total_chars as f64).clamp(0.0, 1.0))
    }

    fn compare(&self, a: &Pid, b: &Pid) -> Result<Ordering, EngineError> {
        Ok(Cfi::from_pid(a)?.compare(&Cfi::from_pid(b)?))
    }

    fn current_section(&self) -> Result<Section, EngineError> {
        let cursor = self.cursor.ok_or(EngineError::NotDisplayed)?;
        Ok(self.content(cursor.section)?.section.clone())
    }

    fn content_tree(&self, section: &Section) -> Result<&ArenaDom, EngineError> {
        Ok(&self.content(section.index)?.dom)
    }

    fn anchor_range(
        &self,
        section: &Section,
        node: NodeId,
        start: usize,
        end: usize,
    ) -> Result<Pid, EngineError> {
        let content = self.checked_node(section, node)?;
        let runs: Vec<(NodeId, usize)> = content
            .dom
            .text_nodes(node)
            .map(|(id, text)| (id, text.chars().count()))
            .collect();
        let len: usize = runs.iter().map(|(_, n)| n).sum();
        if start >= end || end > len {
            return Err(EngineError::InvalidRange { start, end, len });
        }

        let locate = |target: usize, is_end: bool| -> Result<CfiPoint, EngineError> {
            let mut before = 0;
            for &(id, n) in &runs {
                let inside = if is_end {
                    target > before && target <= before + n
                } else {
                    target >= before && target < before + n
                };
                if inside {
                    let steps = cfi::node_steps(&content.dom, id).ok_or(EngineError::NodeNotFound)?;
                    return Ok(CfiPoint::new(steps, Some(target - before)));
                }
                before += n;
            }
            Err(EngineError::InvalidRange { start, end, len })
        };

        let cfi = Cfi::range(
            content.section.index,
            content.section.idref.clone(),
            locate(start, false)?,
            locate(end, true)?,
        );
        Ok(cfi.to_pid())
    }

    fn anchor_node(&self, section: &Section, node: NodeId) -> Result<Pid, EngineError> {
        let content = self.checked_node(section, node)?;
        let steps = cfi::node_steps(&content.dom, node).ok_or(EngineError::NodeNotFound)?;
        Ok(content.cfi(CfiPoint::new(steps, None)).to_pid())
    }
}
