//! Whitespace-delimited table parsing for command output.
//!
//! Lines are split on runs of whitespace. A table may name a trailing column
//! that keeps the remainder of the line as-is (a command line, a mount path).
//! Lines with fewer fields than the table requires are dropped without error.

/// Shape of the expected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    min_columns: usize,
    skip_header: bool,
    tail_column: Option<usize>,
}

impl TableSpec {
    pub const fn new(min_columns: usize) -> Self {
        Self {
            min_columns,
            skip_header: false,
            tail_column: None,
        }
    }

    /// Skip the first non-blank line.
    pub const fn with_header(mut self) -> Self {
        self.skip_header = true;
        self
    }

    /// Column `index` absorbs everything from its first token to the end of the line.
    pub const fn with_tail(mut self, index: usize) -> Self {
        self.tail_column = Some(index);
        self
    }

    pub fn min_columns(&self) -> usize {
        self.min_columns
    }
}

/// One parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<'a> {
    fields: Vec<&'a str>,
}

impl<'a> Row<'a> {
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }

    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Lazy row iterator over a block of text.
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    lines: std::str::Lines<'a>,
    spec: TableSpec,
    header_pending: bool,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for raw in self.lines.by_ref() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if self.header_pending {
                self.header_pending = false;
                continue;
            }

            let fields = split_fields(line, self.spec.tail_column);
            if fields.len() < self.spec.min_columns {
                tracing::trace!(
                    fields = fields.len(),
                    required = self.spec.min_columns,
                    "dropping short row"
                );
                continue;
            }
            return Some(Row { fields });
        }
        None
    }
}

pub fn rows(text: &str, spec: TableSpec) -> Rows<'_> {
    Rows {
        lines: text.lines(),
        spec,
        header_pending: spec.skip_header,
    }
}

fn split_fields(line: &str, tail_column: Option<usize>) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut rest = line;

    while !rest.is_empty() {
        if tail_column == Some(fields.len()) {
            fields.push(rest);
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }

    fields
}
