// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Extension-based file classification

use serde::{Deserialize, Serialize};

/// Label for files no rule claims
pub const OTHERS: &str = "Others";

/// One category and the extensions that belong to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Category label, also used as the subfolder name
    pub category: String,
    /// Extensions without the leading dot
    pub extensions: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: &str, extensions: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
        }
    }

    /// Check if this rule claims an (already lower-cased) extension
    pub fn matches(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }
}

/// Ordered extension table. The first declared rule that claims an
/// extension wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationTable {
    rules: Vec<CategoryRule>,
}

impl Default for ClassificationTable {
    fn default() -> Self {
        Self::new(vec![
            CategoryRule::new("Images", &["jpg", "jpeg", "png", "gif"]),
            CategoryRule::new("Documents", &["pdf", "docx", "txt", "pptx", "csv"]),
            CategoryRule::new("Videos", &["mp4", "mkv", "mov"]),
            CategoryRule::new("Audio", &["mp3", "wav"]),
            CategoryRule::new("Archives", &["zip", "rar"]),
        ])
    }
}

impl ClassificationTable {
    /// Build a table from rules. Extensions are normalized and a rule
    /// named like the catch-all is dropped.
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|r| !r.category.eq_ignore_ascii_case(OTHERS))
            .map(|r| CategoryRule {
                extensions: r.extensions.iter().map(|e| normalize_extension(e)).collect(),
                category: r.category,
            })
            .collect();
        Self { rules }
    }

    /// Category for a file name
    pub fn classify(&self, filename: &str) -> &str {
        match extension_of(filename) {
            Some(ext) => self
                .rules
                .iter()
                .find(|r| r.matches(&ext))
                .map(|r| r.category.as_str())
                .unwrap_or(OTHERS),
            None => OTHERS,
        }
    }

    /// All category labels in declaration order, catch-all last
    pub fn categories(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.rules.len() + 1);
        for rule in &self.rules {
            if !names.contains(&rule.category) {
                names.push(rule.category.clone());
            }
        }
        names.push(OTHERS.to_string());
        names
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }
}

/// Lower-cased text after the last dot, if there is any
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    // ".bashrc" is a hidden name, not an extension
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        let table = ClassificationTable::default();
        assert_eq!(table.classify("report.PDF"), "Documents");
        assert_eq!(table.classify("photo.jpeg"), "Images");
        assert_eq!(table.classify("clip.MoV"), "Videos");
        assert_eq!(table.classify("song.wav"), "Audio");
        assert_eq!(table.classify("bundle.rar"), "Archives");
        assert_eq!(table.classify("IMG_0001.JPG"), table.classify("img_0001.jpg"));
    }

    #[test]
    fn test_unknown_or_missing_extension() {
        let table = ClassificationTable::default();
        assert_eq!(table.classify("Makefile"), OTHERS);
        assert_eq!(table.classify("notes."), OTHERS);
        assert_eq!(table.classify("binary.exe"), OTHERS);
        assert_eq!(table.classify(".bashrc"), OTHERS);
        assert_eq!(extension_of(".png"), None);
    }

    #[test]
    fn test_only_last_segment_counts() {
        let table = ClassificationTable::default();
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(table.classify("archive.tar.gz"), OTHERS);
        assert_eq!(table.classify("holiday.zip.png"), "Images");
    }

    #[test]
    fn test_first_declared_rule_wins() {
        let table = ClassificationTable::new(vec![
            CategoryRule::new("Scans", &["pdf"]),
            CategoryRule::new("Documents", &[".PDF", "txt"]),
        ]);
        assert_eq!(table.classify("a.pdf"), "Scans");
        assert_eq!(table.classify("a.txt"), "Documents");
    }

    #[test]
    fn test_categories_include_catch_all_once() {
        let table = ClassificationTable::new(vec![
            CategoryRule::new("Images", &["png"]),
            CategoryRule::new("others", &["bin"]),
        ]);
        assert_eq!(table.categories(), vec!["Images".to_string(), OTHERS.to_string()]);
        assert_eq!(table.classify("x.bin"), OTHERS);

        let defaults = ClassificationTable::default().categories();
        assert_eq!(
            defaults,
            ["Images", "Documents", "Videos", "Audio", "Archives", "Others"]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_odd_names_land_in_a_declared_category() {
        let table = ClassificationTable::new(vec![
            CategoryRule::new("Images", &["png", " .JPG "]),
            CategoryRule::new("", &["x"]),
            CategoryRule::new("Café", &["ÉTÉ", ""]),
        ]);
        let categories = table.categories();

        let names = [
            "", ".", "..", "...", "a.", ".a", "a..b", "a.b.", "IMG.JPG", "ŞEKİL.png",
            "photo.été", "dir/with.dots/file", "back\\slash.x", "nul\0byte.png",
            "emoji🎉.PNG", "  spaced .png ", "trailing.png\n", "🎉",
        ];
        for name in names {
            let category = table.classify(name);
            assert!(
                categories.iter().any(|c| c == category),
                "{:?} classified into undeclared {:?}",
                name,
                category
            );
            if extension_of(name).is_none() {
                assert_eq!(category, OTHERS, "{:?}", name);
            }
        }
        assert_eq!(table.classify("IMG.JPG"), "Images");
        assert_eq!(table.classify("photo.été"), "Café");
        assert_eq!(table.classify("file.x"), "");
    }
}
