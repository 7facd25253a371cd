// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for analysis crash safety and totality.
//!
//! Feeds arbitrary text through the whole pipeline (lex, parse, bind,
//! graph extraction) and checks that:
//! - nothing panics
//! - token spans and top-level item spans partition the input
//! - the snapshot passes its own consistency checks

#![no_main]

use libfuzzer_sys::fuzz_target;
use snil_core::cst::{SyntaxNodeExt, SyntaxTokenExt, element_len};
use snil_core::language_service::analyze;
use snil_core::source_analysis::Lexer;

fuzz_target!(|data: &[u8]| {
    // The engine works on text; invalid UTF-8 never reaches it.
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(len) = u32::try_from(source.len()) else {
        return;
    };

    // Per line, the lexer covers the input exactly.
    for line in source.split_inclusive('\n') {
        let mut expected = 0;
        for token in Lexer::new(line) {
            assert_eq!(token.span().start(), expected);
            expected = token.span().end();
        }
        assert_eq!(expected as usize, line.len());
    }

    let snapshot = analyze(source);
    assert_eq!(snapshot.cst().text(), source);

    let mut expected = 0;
    let root = snapshot.cst().root();
    for token in root.descendant_tokens() {
        assert_eq!(token.span().start(), expected);
        expected = token.span().end();
    }
    assert_eq!(expected, len);

    let mut offset = 0;
    for (item, &start) in snapshot.cst().items().iter().zip(snapshot.cst().item_offsets()) {
        assert_eq!(start, offset);
        offset += element_len(item);
    }
    assert_eq!(offset, len);

    assert!(snapshot.validate().is_ok());
});
