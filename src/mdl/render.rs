//! Indented text output.

use std::fmt::{self, Display, Write as _};

use crate::util::{Error, Result};

/// Options for text output.
#[derive(Clone, Debug)]
pub struct TextOptions {
    /// Start the file with a `//` comment naming the exporter.
    pub header_comment: bool,
    /// One level of indentation.
    pub indent: String,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self { header_comment: true, indent: "\t".into() }
    }
}

/// Line-oriented writer with block nesting.
///
/// The `*_or` methods leave a field out when it equals its default; the
/// reader restores the same default through `Property::get_or`.
///
/// Quoted strings have no escapes, so a name or path holding `"` cannot be
/// written. The first such value is kept and returned from [`finish`](Self::finish).
pub struct Renderer<'o> {
    out: String,
    depth: usize,
    options: &'o TextOptions,
    error: Option<Error>,
}

impl<'o> Renderer<'o> {
    pub fn new(options: &'o TextOptions) -> Self {
        Self { out: String::new(), depth: 0, options, error: None }
    }

    pub fn finish(self) -> Result<String> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.out),
        }
    }

    fn check_quotable(&mut self, what: &str, value: &str) {
        if self.error.is_none() && value.contains('"') {
            self.error = Some(Error::Unrepresentable {
                what: what.to_owned(),
                value: value.to_owned(),
                reason: "quoted strings cannot contain '\"'",
            });
        }
    }

    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        for _ in 0..self.depth {
            self.out.push_str(&self.options.indent);
        }
        // Writing to a String cannot fail.
        let _ = self.out.write_fmt(args);
        self.out.push('\n');
    }

    pub fn comment(&mut self, text: &str) {
        self.line(format_args!("// {}", text));
    }

    /// `header {` and one level deeper.
    pub fn open(&mut self, header: impl Display) {
        self.line(format_args!("{} {{", header));
        self.depth += 1;
    }

    /// `Kind "name" {`
    pub fn open_named(&mut self, kind: &str, name: &str) {
        self.check_quotable(kind, name);
        self.open(format_args!("{} \"{}\"", kind, name));
    }

    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line(format_args!("}}"));
    }

    /// Bare keyword, written only when `on`.
    pub fn flag(&mut self, key: &str, on: bool) {
        if on {
            self.line(format_args!("{},", key));
        }
    }

    /// One flag line per keyword whose bits are set in `bits`.
    pub fn flags(&mut self, bits: u32, table: &[(u32, &str)]) {
        for &(bit, key) in table {
            self.flag(key, bits & bit == bit);
        }
    }

    pub fn field(&mut self, key: &str, value: impl Display) {
        self.line(format_args!("{} {},", key, value));
    }

    pub fn field_or<T: Display + PartialEq>(&mut self, key: &str, value: T, default: T) {
        if value != default {
            self.field(key, value);
        }
    }

    pub fn static_or<T: Display + PartialEq>(&mut self, key: &str, value: T, default: T) {
        if value != default {
            self.line(format_args!("static {} {},", key, value));
        }
    }

    pub fn array<T: Display>(&mut self, key: &str, values: &[T]) {
        self.field(key, Vector(values));
    }

    pub fn array_or<T: Display + PartialEq>(&mut self, key: &str, values: &[T], default: &[T]) {
        if values != default {
            self.array(key, values);
        }
    }

    pub fn static_array_or<T: Display + PartialEq>(&mut self, key: &str, values: &[T], default: &[T]) {
        if values != default {
            self.line(format_args!("static {} {},", key, Vector(values)));
        }
    }

    pub fn string(&mut self, key: &str, value: &str) {
        self.check_quotable(key, value);
        self.line(format_args!("{} \"{}\",", key, value));
    }

    /// String field left out when empty.
    pub fn string_or_empty(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.string(key, value);
        }
    }

    /// Bare vector entry of a list body.
    pub fn vector<T: Display>(&mut self, values: &[T]) {
        self.line(format_args!("{},", Vector(values)));
    }

    /// `key` written only for ids that are present.
    pub fn optional_id(&mut self, key: &str, id: Option<u32>) {
        if let Some(id) = id {
            self.field(key, id);
        }
    }

    /// `key` with the id, or with `none` in its place.
    pub fn optional_id_or(&mut self, key: &str, id: Option<u32>, none: &str) {
        match id {
            Some(id) => self.field(key, id),
            None => self.field(key, none),
        }
    }
}

/// `{ a, b, c }`
pub struct Vector<'a, T>(pub &'a [T]);

impl<T: Display> Display for Vector<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("{ }");
        }
        f.write_str("{ ")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", v)?;
        }
        f.write_str(" }")
    }
}
