//! Path records and the separator that delimits them.

use std::fmt;

/// One path string flowing through a pipeline.
///
/// Stages never mutate a record in place; each produces a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record(String);

impl Record {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for Record {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Record {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Byte that splits stream input and terminates every output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Separator {
    #[default]
    Newline,
    Space,
    Nul,
}

impl Separator {
    pub fn byte(self) -> u8 {
        match self {
            Separator::Newline => b'\n',
            Separator::Space => b' ',
            Separator::Nul => b'\0',
        }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Separator::Newline => "newline",
            Separator::Space => "space",
            Separator::Nul => "NUL",
        };
        f.write_str(name)
    }
}
