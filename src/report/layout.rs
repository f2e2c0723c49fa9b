//! Page layout: turns a sequence of blocks into per-page draw commands.
//!
//! Coordinates are PDF points with the origin at the bottom-left corner. A
//! block is drawn relative to the cursor; the cursor only moves down.

use std::sync::Arc;

use super::fonts::FontFace;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

pub mod colors {
    use super::Rgb;

    pub const PRIMARY: Rgb = Rgb(0.12, 0.38, 0.53);
    pub const SECONDARY: Rgb = Rgb(0.2, 0.2, 0.2);
    pub const LIGHT_GRAY: Rgb = Rgb(0.85, 0.85, 0.85);
    pub const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
    pub const SUCCESS: Rgb = Rgb(0.15, 0.68, 0.38);
    pub const ERROR: Rgb = Rgb(0.75, 0.22, 0.17);
    pub const WARNING: Rgb = Rgb(1.0, 0.76, 0.03);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        text: String,
        font: FontFace,
        size: f32,
        color: Rgb,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        thickness: f32,
        color: Rgb,
    },
    /// Filled rectangle, `(x, y)` is the lower-left corner
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    /// PNG bytes scaled into the given box
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        png: Arc<Vec<u8>>,
    },
}

impl DrawOp {
    /// Move vertically by `dy` points
    pub fn shifted(mut self, dy: f32) -> Self {
        match &mut self {
            DrawOp::Text { y, .. } | DrawOp::Rect { y, .. } | DrawOp::Image { y, .. } => *y += dy,
            DrawOp::Line { y1, y2, .. } => {
                *y1 += dy;
                *y2 += dy;
            }
        }
        self
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            DrawOp::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 50.0,
            bottom: 50.0,
            left: 50.0,
            right: 50.0,
        }
    }
}

/// A unit of content that is never split across pages.
///
/// `ops` use y offsets relative to the cursor at the start of the block.
/// `need` is the vertical space that must remain above the bottom margin for
/// the block to start on the current page; `advance` is how far the cursor
/// moves once it is placed.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub need: f32,
    pub advance: f32,
    pub ops: Vec<DrawOp>,
}

pub type Page = Vec<DrawOp>;

/// Greedy paginator with a letterhead repeated on every page
#[derive(Debug, Clone)]
pub struct PageLayout {
    size: PageSize,
    margins: Margins,
    letterhead: Vec<DrawOp>,
    pages: Vec<Page>,
    y: f32,
}

impl PageLayout {
    /// Starts with one page already open
    pub fn new(size: PageSize, margins: Margins, letterhead: Vec<DrawOp>) -> Self {
        let mut layout = Self {
            size,
            margins,
            letterhead,
            pages: Vec::new(),
            y: 0.0,
        };
        layout.new_page();
        layout
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn content_width(&self) -> f32 {
        self.size.width - self.margins.left - self.margins.right
    }

    pub fn new_page(&mut self) {
        self.pages.push(self.letterhead.clone());
        self.y = self.size.height - self.margins.top;
    }

    pub fn fits(&self, height: f32) -> bool {
        self.y - height >= self.margins.bottom
    }

    /// Break the page when `height` no longer fits. Returns whether a page was added.
    pub fn ensure_space(&mut self, height: f32) -> bool {
        if self.fits(height) {
            false
        } else {
            self.new_page();
            true
        }
    }

    pub fn place(&mut self, block: Block) {
        self.ensure_space(block.need);
        let y = self.y;
        if let Some(page) = self.pages.last_mut() {
            page.extend(block.ops.into_iter().map(|op| op.shifted(y)));
        }
        self.y -= block.advance;
    }

    /// Close the document, appending `footer(page_number, total)` to each page
    pub fn finish<F>(mut self, footer: F) -> Vec<Page>
    where
        F: Fn(usize, usize) -> Vec<DrawOp>,
    {
        let total = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.extend(footer(i + 1, total));
        }
        self.pages
    }
}

/// Lay out `blocks` in order; the stateless entry point over `PageLayout`
pub fn paginate(size: PageSize, margins: Margins, letterhead: Vec<DrawOp>, blocks: Vec<Block>) -> Vec<Page> {
    let mut layout = PageLayout::new(size, margins, letterhead);
    for block in blocks {
        layout.place(block);
    }
    layout.finish(|_, _| Vec::new())
}
