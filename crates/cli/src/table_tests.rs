// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn rendered(table: &Table) -> String {
    let mut buf = Vec::new();
    table.render(&mut buf);
    String::from_utf8(buf).unwrap()
}

#[test]
fn empty_table_prints_nothing() {
    let table = Table::plain(vec![Column::left("NAME"), Column::status("PHASE")]);

    assert_eq!(rendered(&table), "");
}

#[test]
fn columns_pad_to_widest_cell() {
    let mut table = Table::plain(vec![Column::left("NAME"), Column::status("PHASE")]);
    table.row(vec!["ws1".into(), "Running".into()]);
    table.row(vec!["longer-name".into(), "Stopped".into()]);

    assert_eq!(
        rendered(&table),
        "NAME         PHASE\nws1          Running\nlonger-name  Stopped\n"
    );
}

#[test]
fn max_width_cuts_long_values() {
    let mut table = Table::plain(vec![Column::left("NAME").with_max(4), Column::muted("EDITOR")]);
    table.row(vec!["abcdef".into(), "che-idea".into()]);

    assert_eq!(rendered(&table), "NAME  EDITOR\nabcd  che-idea\n");
}

#[test]
fn missing_cells_render_blank() {
    let mut table = Table::plain(vec![Column::left("NAME"), Column::left("EDITOR")]);
    table.row(vec!["ws1".into()]);

    assert_eq!(rendered(&table).lines().nth(1), Some("ws1   "));
}

#[test]
fn status_cells_are_painted_after_padding() {
    let mut table = Table::plain(vec![Column::status("PHASE"), Column::left("NAME")]);
    table.colorize = true;
    table.row(vec!["Failed".into(), "ws1".into()]);

    let out = rendered(&table);

    assert!(out.contains("\x1b[31mFailed\x1b[0m  ws1"), "{out:?}");
}
