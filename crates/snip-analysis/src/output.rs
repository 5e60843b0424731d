use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::AnalysisError;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AnalysisError> {
    let raw = fs::read_to_string(path).map_err(|source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AnalysisError> {
    ensure_parent(path)?;
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// One path per line; blank lines are ignored.
pub fn read_path_list(path: &Path) -> Result<Vec<String>, AnalysisError> {
    let raw = fs::read_to_string(path).map_err(|source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect())
}

pub fn write_path_list(path: &Path, items: &[String]) -> Result<(), AnalysisError> {
    ensure_parent(path)?;
    let mut content = items.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

pub fn write_text(path: &Path, content: &str) -> Result<(), AnalysisError> {
    ensure_parent(path)?;
    fs::write(path, content)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), AnalysisError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Minimal CSV writer: a fixed header plus rows, quoted only where needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|column| (*column).to_owned()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in std::iter::once(&self.header).chain(self.rows.iter()) {
            let line = row
                .iter()
                .map(|field| escape_field(field))
                .collect::<Vec<_>>()
                .join(",");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<PathBuf, AnalysisError> {
        write_text(path, &self.render())?;
        Ok(path.to_path_buf())
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_fields_are_quoted_only_when_needed() {
        let mut table = CsvTable::new(&["Bandit Rule", "Description"]);
        table.push_row(vec!["B307".to_owned(), "Use of eval, \"unsafe\"".to_owned()]);
        table.push_row(vec!["B101".to_owned(), "assert used".to_owned()]);

        assert_eq!(
            table.render(),
            "Bandit Rule,Description\nB307,\"Use of eval, \"\"unsafe\"\"\"\nB101,assert used\n"
        );
    }

    #[test]
    fn path_lists_skip_blank_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("lists/accepted.txt");

        write_path_list(&path, &["a/b.py".to_owned(), "c/d.py".to_owned()]).expect("write");
        std::fs::write(&path, "a/b.py\n\n  c/d.py  \n").expect("rewrite");

        assert_eq!(read_path_list(&path).expect("read"), vec!["a/b.py", "c/d.py"]);
    }
}
