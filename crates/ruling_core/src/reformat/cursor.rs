/// Forward-only position over the normalized lines of a ruling.
#[derive(Debug, Clone)]
pub(crate) struct ScanCursor {
    lines: Vec<String>,
    pos: usize,
}

impl ScanCursor {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_owned).collect(),
            pos: 0,
        }
    }

    /// Skips blank lines at the current position.
    pub(crate) fn skip_blank(&mut self) {
        while self
            .lines
            .get(self.pos)
            .is_some_and(|line| line.trim().is_empty())
        {
            self.pos += 1;
        }
    }

    /// Absolute index of the first unread line satisfying `predicate`.
    pub(crate) fn find(&self, mut predicate: impl FnMut(&str) -> bool) -> Option<usize> {
        self.lines[self.pos..]
            .iter()
            .position(|line| predicate(line))
            .map(|offset| self.pos + offset)
    }

    /// Consumes lines up to, not including, `end`.
    pub(crate) fn take_until(&mut self, end: usize) -> Vec<String> {
        let end = end.clamp(self.pos, self.lines.len());
        let taken = self.lines[self.pos..end].to_vec();
        self.pos = end;
        taken
    }

    /// Splits line `index` after byte offset `at`; the tail becomes its own line.
    pub(crate) fn split_line(&mut self, index: usize, at: usize) {
        let tail = self.lines[index].split_off(at);
        self.lines.insert(index + 1, tail);
    }

    pub(crate) fn peek(&self) -> Option<&str> {
        self.lines.get(self.pos).map(String::as_str)
    }

    pub(crate) fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub(crate) fn advance(&mut self) -> Option<String> {
        let line = self.lines.get(self.pos).cloned()?;
        self.pos += 1;
        Some(line)
    }

    pub(crate) fn take_rest(&mut self) -> Vec<String> {
        self.take_until(self.lines.len())
    }
}
