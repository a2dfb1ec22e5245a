//! Line mode post-processing of tty output
//!
//! The tty log is raw output: backspaces, carriage returns, color escapes.
//! None of that is text, and all of it is confusing when read aloud, so
//! output is cleaned up as it is appended to the log.

use crate::symbols;
use crate::{AcsError, Result};
use log::trace;
use std::ops::BitOr;
use vte::{Parser, Perform};

/// Which clean-up steps to apply to line mode output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcess(u8);

impl PostProcess {
    /// Control H erases the previous character
    pub const CTRL_H: PostProcess = PostProcess(0x1);
    /// CR LF becomes LF
    pub const CRLF: PostProcess = PostProcess(0x2);
    /// Drop control characters other than bell, CR, and LF
    pub const STRIP_CTRL: PostProcess = PostProcess(0x4);
    /// Drop ANSI escape sequences
    pub const STRIP_ESCB: PostProcess = PostProcess(0x8);

    pub const NONE: PostProcess = PostProcess(0);
    pub const ALL: PostProcess = PostProcess(0xf);

    pub fn contains(self, other: PostProcess) -> bool {
        self.0 & other.0 == other.0
    }

    /// Parse a comma separated list such as `ctrl_h,crlf`.
    /// `all` and `none` are accepted as well.
    pub fn parse(list: &str) -> Result<Self> {
        let mut pp = PostProcess::NONE;
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            pp = pp
                | match name {
                    "ctrl_h" => PostProcess::CTRL_H,
                    "crlf" => PostProcess::CRLF,
                    "strip_ctrl" => PostProcess::STRIP_CTRL,
                    "strip_escb" => PostProcess::STRIP_ESCB,
                    "all" => PostProcess::ALL,
                    "none" => PostProcess::NONE,
                    other => {
                        return Err(AcsError::Config(format!(
                            "unknown postprocess step '{}'",
                            other
                        )))
                    }
                };
        }
        Ok(pp)
    }
}

impl Default for PostProcess {
    fn default() -> Self {
        PostProcess::ALL
    }
}

impl BitOr for PostProcess {
    type Output = PostProcess;

    fn bitor(self, rhs: PostProcess) -> PostProcess {
        PostProcess(self.0 | rhs.0)
    }
}

/// What the filter wants done to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edit {
    Push(u32),
    Erase,
}

/// Collects the text vte lets through, dropping escape sequences
struct TextCollector<'a> {
    out: &'a mut Vec<u32>,
}

impl<'a> Perform for TextCollector<'a> {
    fn print(&mut self, c: char) {
        self.out.push(c as u32);
    }

    fn execute(&mut self, byte: u8) {
        self.out.push(byte as u32);
    }

    fn csi_dispatch(
        &mut self,
        _params: &vte::Params,
        _intermediates: &[u8],
        _ignore: bool,
        action: char,
    ) {
        trace!("Dropping CSI sequence ending in '{}'", action);
    }
}

/// Stateful filter; escape sequences and CR LF pairs may straddle refreshes
pub(crate) struct LogFilter {
    parser: Parser,
    pending_cr: bool,
    scratch: Vec<u32>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            pending_cr: false,
            scratch: Vec::new(),
        }
    }

    /// Forget partial escape sequences and a held carriage return
    pub fn reset(&mut self) {
        self.parser = Parser::new();
        self.pending_cr = false;
    }

    /// Run one code point of output through the filter
    pub fn feed(&mut self, pp: PostProcess, ch: u32, edits: &mut Vec<Edit>) {
        if !pp.contains(PostProcess::STRIP_ESCB) {
            self.line_endings(pp, ch, edits);
            return;
        }

        let Some(c) = char::from_u32(ch) else {
            return;
        };
        let mut utf8 = [0u8; 4];
        self.scratch.clear();
        {
            let mut collector = TextCollector {
                out: &mut self.scratch,
            };
            for &byte in c.encode_utf8(&mut utf8).as_bytes() {
                self.parser.advance(&mut collector, byte);
            }
        }
        let passed = std::mem::take(&mut self.scratch);
        for &text in &passed {
            self.line_endings(pp, text, edits);
        }
        self.scratch = passed;
    }

    fn line_endings(&mut self, pp: PostProcess, ch: u32, edits: &mut Vec<Edit>) {
        if pp.contains(PostProcess::CRLF) {
            if self.pending_cr {
                self.pending_cr = false;
                if ch == '\n' as u32 {
                    edits.push(Edit::Push(ch));
                    return;
                }
                self.controls(pp, '\r' as u32, edits);
            }
            if ch == '\r' as u32 {
                self.pending_cr = true;
                return;
            }
        }
        self.controls(pp, ch, edits);
    }

    fn controls(&self, pp: PostProcess, ch: u32, edits: &mut Vec<Edit>) {
        if ch == 0x08 && pp.contains(PostProcess::CTRL_H) {
            edits.push(Edit::Erase);
            return;
        }
        if pp.contains(PostProcess::STRIP_CTRL) && symbols::is_control(ch) {
            match ch {
                0x07 | 0x0d => edits.push(Edit::Push(ch)),
                // Tabs would glue words together if dropped
                0x09 => edits.push(Edit::Push(' ' as u32)),
                _ => {}
            }
            return;
        }
        edits.push(Edit::Push(ch));
    }
}
