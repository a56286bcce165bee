// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tidydir::classify::{extension_of, CategoryRule, ClassificationTable, OTHERS};

#[derive(Arbitrary, Debug)]
struct Input {
    filename: String,
    rules: Vec<(String, Vec<String>)>,
    use_default_table: bool,
}

fuzz_target!(|input: Input| {
    let table = if input.use_default_table {
        ClassificationTable::default()
    } else {
        let rules = input
            .rules
            .iter()
            .map(|(category, extensions)| {
                let extensions: Vec<&str> = extensions.iter().map(String::as_str).collect();
                CategoryRule::new(category, &extensions)
            })
            .collect();
        ClassificationTable::new(rules)
    };

    let category = table.classify(&input.filename);
    assert!(
        category == OTHERS || table.categories().iter().any(|c| c == category),
        "{:?} classified into undeclared category {:?}",
        input.filename,
        category
    );

    match extension_of(&input.filename) {
        Some(ext) => {
            assert!(!ext.is_empty());
            assert!(!ext.contains('.'));
        }
        None => assert_eq!(category, OTHERS),
    }
});
