//! Column selections accepted by table operations.

/// One or more column names.
///
/// Operations that take "a column or a collection of columns" accept
/// anything convertible into a `ColumnList`, so both `"a"` and
/// `["a", "b"]` work at the call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnList(Vec<String>);

impl ColumnList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }
}

impl From<&str> for ColumnList {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for ColumnList {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<&String> for ColumnList {
    fn from(name: &String) -> Self {
        Self(vec![name.clone()])
    }
}

impl From<&[&str]> for ColumnList {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&[String]> for ColumnList {
    fn from(names: &[String]) -> Self {
        Self(names.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for ColumnList {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<&str>> for ColumnList {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for ColumnList {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl<'a> IntoIterator for &'a ColumnList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
