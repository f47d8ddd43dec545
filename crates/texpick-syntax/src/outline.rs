//! Extent computation for sectioning headings.
//!
//! A heading's body runs from its own marker up to, but not including, the
//! next marker of the same or a higher priority (a lower or equal level), or
//! to the end of the scanned region. A `\section` therefore swallows its
//! subsections, while a `\subsection` stops at the next `\subsection` or
//! `\section`.
//!
//! This is an approximation of nesting. Braces, environments and comments are
//! not consulted.

use crate::lexer::HeadingMarker;

/// One heading that has been opened but not yet closed.
#[derive(Debug, Clone, Copy)]
struct Open {
    index: usize,
    level: u8,
}

/// Computes the end offset of every marker.
///
/// The returned vector is parallel to `markers`. `limit` is the offset that
/// closes all headings still open at the end of the region. Markers must be
/// sorted by offset.
pub fn extent_ends(markers: &[HeadingMarker], limit: usize) -> Vec<usize> {
    let mut ends = vec![limit; markers.len()];
    let mut open: Vec<Open> = Vec::new();

    for (index, marker) in markers.iter().enumerate() {
        let level = marker.level();
        // Every open heading at this level or deeper ends here.
        while let Some(top) = open.last() {
            if top.level < level {
                break;
            }
            ends[top.index] = marker.offset;
            open.pop();
        }
        open.push(Open { index, level });
    }

    ends
}

/// Computes the end offset of a single marker by scanning forward.
///
/// Equivalent to `extent_ends(markers, limit)[index]`.
pub fn extent_end(markers: &[HeadingMarker], index: usize, limit: usize) -> usize {
    let level = markers[index].level();
    markers[index + 1..]
        .iter()
        .find(|next| next.level() <= level)
        .map_or(limit, |next| next.offset)
}
