//////////////////////////////////////////////////////////////
/// Input sources
///
/// The outer interpreter (READ) needs a stack of input sources so that
/// a file loaded mid-session (via bload-like file chaining, or a second
/// file named on the command line) can be read to completion and then
/// control returns to whatever was reading before it. Grounded on the
/// teacher's `reader: Vec<FileHandle>` stack in `kernel.rs`/`files.rs`,
/// where `f_key`/`f_accept` always read from `self.reader.last()`.
use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// One line of pending input, plus a cursor into it for token scanning.
pub struct InputSource {
    name: String,
    lines: Box<dyn Iterator<Item = io::Result<String>>>,
    buffer: Vec<u8>,
    cursor: usize,
}

impl InputSource {
    pub fn from_stdin() -> InputSource {
        let reader = BufReader::new(io::stdin());
        InputSource {
            name: "<stdin>".to_string(),
            lines: Box::new(reader.lines()),
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    pub fn from_file(path: &std::path::Path) -> io::Result<InputSource> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut src = InputSource {
            name: path.display().to_string(),
            lines: Box::new(reader.lines()),
            buffer: Vec::new(),
            cursor: 0,
        };
        // A leading line starting with `#` is a shebang (or a comment
        // standing in for one) and is consumed so an executable Forth
        // script can be run directly.
        if let Some(first) = src.lines.next() {
            match first {
                Ok(line) if line.starts_with('#') => {}
                Ok(line) => src.buffer = line.into_bytes(),
                Err(_) => {}
            }
        }
        Ok(src)
    }

    pub fn from_string(name: &str, text: &str) -> InputSource {
        InputSource {
            name: name.to_string(),
            lines: Box::new(text.lines().map(|l| Ok(l.to_string())).collect::<Vec<_>>().into_iter()),
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pulls the next whitespace-delimited token from the buffer, pulling
    /// new lines in as needed. Returns None at end of source. Tokens
    /// longer than the scratch buffer's capacity are truncated, matching
    /// the fixed-size scratch pad the rest of the VM shares.
    pub fn next_token(&mut self, max_len: usize) -> Option<String> {
        loop {
            while self.cursor < self.buffer.len() && self.buffer[self.cursor].is_ascii_whitespace()
            {
                self.cursor += 1;
            }
            if self.cursor >= self.buffer.len() {
                if !self.refill() {
                    return None;
                }
                continue;
            }
            let start = self.cursor;
            while self.cursor < self.buffer.len() && !self.buffer[self.cursor].is_ascii_whitespace()
            {
                self.cursor += 1;
            }
            let mut token = self.buffer[start..self.cursor].to_vec();
            token.truncate(max_len);
            return Some(String::from_utf8_lossy(&token).to_string());
        }
    }

    /// Reads one raw character, used by the KEY primitive. Returns None at
    /// end of source.
    pub fn next_char(&mut self) -> Option<u8> {
        if self.cursor >= self.buffer.len() {
            if !self.refill() {
                return None;
            }
            // refill() replaces buffer with a fresh line with no trailing
            // newline; KEY still wants to see line boundaries, so hand
            // back a newline once the buffer is drained on the next call.
            let c = self.next_char();
            return c.or(Some(b'\n'));
        }
        let c = self.buffer[self.cursor];
        self.cursor += 1;
        Some(c)
    }

    /// Discards whatever is left of the currently buffered line without
    /// pulling in the next one. Used by the `\` line-comment primitive,
    /// which must stop at this line's end rather than reading ahead.
    pub fn skip_rest_of_line(&mut self) {
        self.cursor = self.buffer.len();
    }

    fn refill(&mut self) -> bool {
        match self.lines.next() {
            Some(Ok(line)) => {
                self.buffer = line.into_bytes();
                self.cursor = 0;
                true
            }
            Some(Err(_)) | None => false,
        }
    }
}

/// A stack of input sources, innermost (current) last; READ always reads
/// from the top, and a file that runs dry pops itself off so control
/// returns to whatever was reading before it.
pub struct InputStack {
    sources: Vec<InputSource>,
}

impl InputStack {
    pub fn new() -> InputStack {
        InputStack {
            sources: vec![InputSource::from_stdin()],
        }
    }

    pub fn push(&mut self, source: InputSource) {
        self.sources.push(source);
    }

    pub fn next_token(&mut self, max_len: usize) -> Option<String> {
        loop {
            let top = self.sources.last_mut()?;
            if let Some(tok) = top.next_token(max_len) {
                return Some(tok);
            }
            if self.sources.len() > 1 {
                self.sources.pop();
                continue;
            }
            return None;
        }
    }

    pub fn next_char(&mut self) -> Option<u8> {
        loop {
            let top = self.sources.last_mut()?;
            if let Some(c) = top.next_char() {
                return Some(c);
            }
            if self.sources.len() > 1 {
                self.sources.pop();
                continue;
            }
            return None;
        }
    }

    pub fn depth(&self) -> usize {
        self.sources.len()
    }

    /// Discards whatever remains of the current (innermost) source's
    /// buffered line, leaving the next `next_token`/`next_char` call to
    /// refill from that source's following line.
    pub fn skip_rest_of_line(&mut self) {
        if let Some(top) = self.sources.last_mut() {
            top.skip_rest_of_line();
        }
    }
}

impl Default for InputStack {
    fn default() -> Self {
        InputStack::new()
    }
}
