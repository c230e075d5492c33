use argtree::{FlagId, ListId, Parser, ValueId};
use expect_test::expect;

use crate::{check_err, parse};

struct App {
    p: Parser,
    verbose: FlagId,
    port: ValueId<u32>,
    tags: ListId<String>,
    path: ValueId<String>,
}

impl App {
    fn new() -> App {
        let mut p = Parser::new("app", "Does the thing.");
        let verbose = p.flag('v', "verbose", "Prints more.");
        let port = p.value::<u32>('p', "port", "Port to bind.");
        let tags = p.list::<String>('t', "tag", "Tags to apply.");
        let path = p.arg::<String>("path", "Input path.");
        App { p, verbose, port, tags, path }
    }
}

#[test]
fn flags_count() {
    let mut app = App::new();
    parse(&mut app.p, "-v -v -v x").unwrap();
    assert_eq!(app.p.count(app.verbose), 3);
    assert!(app.p.is_set(app.verbose));

    let mut app = App::new();
    parse(&mut app.p, "-vvv x").unwrap();
    assert_eq!(app.p.count(app.verbose), 3);

    let mut app = App::new();
    parse(&mut app.p, "--verbose -v x").unwrap();
    assert_eq!(app.p.count(app.verbose), 2);

    let mut app = App::new();
    parse(&mut app.p, "x").unwrap();
    assert_eq!(app.p.count(app.verbose), 0);
    assert!(!app.p.is_set(app.verbose));
}

#[test]
fn values_keep_the_last_occurrence() {
    let mut app = App::new();
    parse(&mut app.p, "-p 1 --port 2 x").unwrap();
    assert_eq!(app.p.get(app.port), Some(&2));
}

#[test]
fn lists_stop_at_the_next_option() {
    let mut app = App::new();
    parse(&mut app.p, "--tag a b c --verbose x").unwrap();
    assert_eq!(app.p.get_all(app.tags), ["a", "b", "c"]);
    assert!(app.p.is_set(app.verbose));
    assert_eq!(app.p.get(app.path).map(String::as_str), Some("x"));
}

#[test]
fn lists_append_across_occurrences() {
    let mut app = App::new();
    parse(&mut app.p, "-t a b --tag c x").unwrap();
    assert_eq!(app.p.get_all(app.tags), ["a", "b", "c"]);
}

#[test]
fn values_take_the_next_token_even_if_it_looks_like_an_option() {
    let mut app = App::new();
    check_err(
        &mut app.p,
        "--port --tag x",
        expect!["can't parse `--tag` as u32 for `--port`: invalid digit found in string"],
    );
}

#[test]
fn conversion_failures_name_the_spelling_used() {
    let mut app = App::new();
    check_err(
        &mut app.p,
        "-p lol x",
        expect!["can't parse `lol` as u32 for `-p`: invalid digit found in string"],
    );

    let mut app = App::new();
    check_err(
        &mut app.p,
        "--port lol x",
        expect!["can't parse `lol` as u32 for `--port`: invalid digit found in string"],
    );
}

#[test]
fn missing_values() {
    let mut app = App::new();
    check_err(&mut app.p, "x --port", expect!["expected a value for `--port`"]);

    let mut app = App::new();
    check_err(&mut app.p, "x --tag", expect!["expected a value for `--tag`"]);

    let mut app = App::new();
    check_err(&mut app.p, "x --tag -v", expect!["expected a value for `--tag`"]);
}

#[test]
fn unknown_options() {
    let mut app = App::new();
    check_err(&mut app.p, "--werbose x", expect!["unknown option: `--werbose`"]);

    let mut app = App::new();
    check_err(&mut app.p, "-x", expect!["unknown option: `-x`"]);

    let mut app = App::new();
    check_err(&mut app.p, "--", expect!["unknown option: `--`"]);
}

#[test]
fn clusters_take_flags_only() {
    let mut app = App::new();
    check_err(&mut app.p, "-vp 80 x", expect!["unknown option: `-p`"]);

    let mut app = App::new();
    check_err(&mut app.p, "-vz x", expect!["unknown option: `-z`"]);
}

#[test]
fn unexpected_arguments_are_rejected() {
    let mut app = App::new();
    let err = parse(&mut app.p, "x y").unwrap_err();
    assert!(matches!(err.kind(), argtree::ErrorKind::UnmatchedArgument(_)));
    expect!["unexpected argument: `y`"].assert_eq(&err.to_string());
}

#[test]
fn missing_required_is_reported_after_the_pass() {
    let mut app = App::new();
    check_err(&mut app.p, "-v --port 80", expect!["missing required argument(s): `path`"]);
}

#[test]
fn lone_dash_is_a_plain_argument() {
    let mut app = App::new();
    parse(&mut app.p, "-").unwrap();
    assert_eq!(app.p.get(app.path).map(String::as_str), Some("-"));
}

#[test]
fn integers_round_trip() {
    let mut app = App::new();
    parse(&mut app.p, "-p 8080 x").unwrap();
    assert_eq!(app.p.get(app.port).map(u32::to_string).as_deref(), Some("8080"));
}

#[test]
fn reparsing_accumulates() {
    let mut app = App::new();
    parse(&mut app.p, "-v --tag a -p 1 x").unwrap();
    parse(&mut app.p, "-v --tag b -p 2 y").unwrap();
    assert_eq!(app.p.count(app.verbose), 2);
    assert_eq!(app.p.get_all(app.tags), ["a", "b"]);
    assert_eq!(app.p.get(app.port), Some(&2));
    assert_eq!(app.p.get(app.path).map(String::as_str), Some("y"));
}

#[test]
fn report_folds_the_outcome_into_a_bool() {
    let mut app = App::new();
    assert!(app.p.parse_from(["x"]));

    let mut app = App::new();
    assert!(!app.p.parse_from(["--nope", "x"]));
}

#[cfg(unix)]
#[test]
fn non_utf8_values_are_conversion_errors() {
    use std::{ffi::OsString, os::unix::ffi::OsStringExt};

    let mut app = App::new();
    let err = app.p.try_parse_from([OsString::from_vec(vec![b'x', 0xff])]).unwrap_err();
    expect!["can't parse `x�` as String for `path`: invalid utf8"].assert_eq(&err.to_string());
}
