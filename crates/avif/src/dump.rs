//! Listing the box tree of a serialized file.

use std::fmt;

use crate::boxes::FourCC;

/// One box found by [`list_boxes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxSummary {
    /// Nesting depth, 0 for top-level boxes.
    pub depth: usize,
    /// Box type.
    pub fourcc: FourCC,
    /// Offset of the box header.
    pub offset: usize,
    /// Total size, header included.
    pub size: usize,
    /// Size of the header.
    pub header_size: usize,
}

impl BoxSummary {
    /// Offset one past the end of the box.
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }

    /// Offset of the first body byte.
    pub const fn body_start(&self) -> usize {
        self.offset + self.header_size
    }
}

impl fmt::Display for BoxSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:indent$}{} @{} size={}",
            "",
            self.fourcc,
            self.offset,
            self.size,
            indent = self.depth * 2
        )
    }
}

/// Read a box header: returns `(total_box_size, fourcc, header_size)`.
///
/// Handles 32-bit size, 64-bit extended size (`size == 1`),
/// and box-extends-to-EOF (`size == 0`).
fn read_box_header(data: &[u8]) -> Option<(usize, [u8; 4], usize)> {
    if data.len() < 8 {
        return None;
    }

    let size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as u64;
    let fourcc: [u8; 4] = [data[4], data[5], data[6], data[7]];

    match size {
        1 => {
            let ext = data.get(8..16)?;
            let ext_size = u64::from_be_bytes(ext.try_into().ok()?);
            Some((usize::try_from(ext_size).ok()?, fourcc, 16))
        }
        0 => Some((data.len(), fourcc, 8)),
        _ => Some((size as usize, fourcc, 8)),
    }
}

/// Bytes between the end of a container's header and its first child.
///
/// `meta` and `iinf` are full boxes; `iinf` also carries an entry count whose
/// width depends on the version.
fn children_offset(fourcc: &[u8; 4], body: &[u8]) -> Option<usize> {
    match fourcc {
        b"iprp" | b"ipco" | b"dinf" => Some(0),
        b"meta" => Some(4),
        b"iinf" => match body.first()? {
            0 => Some(4 + 2),
            _ => Some(4 + 4),
        },
        _ => None,
    }
}

/// Lists every box in `data`, descending into the containers of an AVIF `meta` box.
///
/// Listing stops at the first box whose header is truncated or whose size
/// runs past its parent.
pub fn list_boxes(data: &[u8]) -> Vec<BoxSummary> {
    let mut out = Vec::new();
    walk(data, 0, data.len(), 0, &mut out);
    out
}

fn walk(data: &[u8], start: usize, end: usize, depth: usize, out: &mut Vec<BoxSummary>) {
    let mut offset = start;
    while offset < end {
        let Some((size, fourcc, header_size)) = read_box_header(&data[offset..end]) else {
            break;
        };
        if size < header_size || offset + size > end {
            break;
        }

        let summary = BoxSummary {
            depth,
            fourcc: FourCC(fourcc),
            offset,
            size,
            header_size,
        };
        out.push(summary);

        let body = &data[summary.body_start()..summary.end()];
        if let Some(skip) = children_offset(&fourcc, body) {
            if skip <= body.len() {
                walk(data, summary.body_start() + skip, summary.end(), depth + 1, out);
            }
        }

        offset = summary.end();
    }
}

/// Finds the first box of type `fourcc` anywhere in the listing.
pub fn find_box(boxes: &[BoxSummary], fourcc: &[u8; 4]) -> Option<BoxSummary> {
    boxes.iter().find(|b| b.fourcc.as_bytes() == fourcc).copied()
}
