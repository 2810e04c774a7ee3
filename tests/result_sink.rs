use simscore::batch::sink::CSV_HEADER;
use simscore::ResultSink;
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

fn read_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn rows_are_formatted_with_six_decimals() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ResultSink::new(dir.path());
    sink.prepare().unwrap();
    sink.reset_expected_count(2);

    assert!(!sink.handle_result("MSV", "a.png", 0.5));
    assert!(sink.handle_result("MSV", "b.png", 1.0 / 3.0));
    sink.close_all();

    let lines = read_lines(&sink.table_path("MSV"));
    assert_eq!(lines, vec![CSV_HEADER, "a.png,0.500000", "b.png,0.333333"]);
    let stats = sink.stats();
    assert_eq!(stats.saved, 2);
    assert_eq!(stats.expected_remaining, 0);
}

#[test]
fn concurrent_writers_produce_whole_rows_and_one_drain() {
    const THREADS: usize = 8;
    const ROWS: usize = 50;

    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(ResultSink::new(dir.path()));
    sink.prepare().unwrap();
    sink.reset_expected_count(THREADS * ROWS);
    let drains = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let sink = Arc::clone(&sink);
            let drains = Arc::clone(&drains);
            thread::spawn(move || {
                for r in 0..ROWS {
                    let file = format!("t{t}_r{r}.png");
                    if sink.handle_result("ZNCC", &file, (t * ROWS + r) as f64 / 1000.0) {
                        drains.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    sink.close_all();

    assert_eq!(drains.load(Ordering::SeqCst), 1);
    let lines = read_lines(&sink.table_path("ZNCC"));
    assert_eq!(lines[0], CSV_HEADER);
    assert_eq!(lines.iter().filter(|l| *l == CSV_HEADER).count(), 1);

    let rows = &lines[1..];
    assert_eq!(rows.len(), THREADS * ROWS);
    let names: HashSet<&str> = rows
        .iter()
        .map(|row| {
            let (name, value) = row.split_once(',').unwrap();
            assert!(value.parse::<f64>().is_ok(), "{row}");
            name
        })
        .collect();
    assert_eq!(names.len(), THREADS * ROWS);
}

#[test]
fn skips_and_results_share_one_counter() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ResultSink::new(dir.path());
    sink.prepare().unwrap();
    sink.reset_expected_count(5);

    assert!(!sink.decrement_expected_count(3));
    assert!(!sink.handle_result("MSV", "a.png", 1.0));
    assert!(sink.decrement_expected_count(1));
    // Already drained: further calls never report again.
    assert!(!sink.decrement_expected_count(1));

    let stats = sink.stats();
    assert_eq!(stats.skipped, 5);
    assert_eq!(stats.received, 1);
    assert_eq!(stats.expected_remaining, 0);
}

#[test]
fn aborted_sink_drops_rows_but_keeps_counting() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ResultSink::new(dir.path());
    sink.prepare().unwrap();
    sink.reset_expected_count(3);

    sink.handle_result("MSV", "a.png", 1.0);
    sink.abort();
    assert!(sink.is_aborted());
    assert!(!sink.handle_result("MSV", "b.png", 2.0));
    assert!(sink.handle_result("NIPC", "b.png", 3.0));

    let stats = sink.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.saved, 1);
    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.expected_remaining, 0);
    assert_eq!(read_lines(&sink.table_path("MSV")), vec![CSV_HEADER, "a.png,1.000000"]);
    assert!(!sink.table_path("NIPC").exists());

    sink.prepare().unwrap();
    assert!(!sink.is_aborted());
}

#[test]
fn later_runs_append_without_repeating_the_header() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ResultSink::new(dir.path());
    for run in 0..3 {
        sink.prepare().unwrap();
        sink.reset_expected_count(1);
        assert!(sink.handle_result("Homogeneity", &format!("run{run}.png"), 0.25));
        sink.close_all();
    }

    let lines = read_lines(&sink.table_path("Homogeneity"));
    assert_eq!(
        lines,
        vec![
            CSV_HEADER,
            "run0.png,0.250000",
            "run1.png,0.250000",
            "run2.png,0.250000"
        ]
    );
}

#[test]
fn unopenable_table_drops_rows_and_still_decrements() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ResultSink::new(dir.path());
    sink.prepare().unwrap();
    // A directory in place of the table makes the open fail.
    fs::create_dir(sink.table_path("MSV")).unwrap();
    sink.reset_expected_count(3);

    assert!(!sink.handle_result("MSV", "a.png", 1.0));
    assert!(!sink.handle_result("ZNCC", "a.png", 0.5));
    assert!(sink.handle_result("MSV", "b.png", 2.0));
    sink.close_all();

    let stats = sink.stats();
    assert_eq!(stats.saved, 1);
    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.expected_remaining, 0);
    assert_eq!(read_lines(&sink.table_path("ZNCC")), vec![CSV_HEADER, "a.png,0.500000"]);
}

#[test]
fn prepare_creates_missing_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("runs").join("today");
    let sink = ResultSink::new(&nested);
    sink.prepare().unwrap();
    assert!(nested.is_dir());
    assert_eq!(sink.output_dir(), nested);
}

#[test]
fn stale_generation_cannot_abort_a_later_run() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ResultSink::new(dir.path());
    let first = sink.prepare().unwrap();
    sink.reset_expected_count(1);
    assert!(sink.handle_result("MSV", "first.png", 1.0));
    sink.close_all();

    let second = sink.prepare().unwrap();
    assert_ne!(first, second);
    assert_eq!(sink.generation(), second);
    sink.reset_expected_count(2);

    assert!(!sink.abort_generation(first));
    assert!(!sink.is_aborted());
    assert!(!sink.handle_result("MSV", "second.png", 2.0));

    assert!(sink.abort_generation(second));
    assert!(sink.is_aborted());
    assert!(sink.handle_result("MSV", "late.png", 3.0));

    let stats = sink.stats();
    assert_eq!(stats.saved, 1);
    assert_eq!(stats.dropped, 1);
    assert_eq!(
        read_lines(&sink.table_path("MSV")),
        vec![CSV_HEADER, "first.png,1.000000", "second.png,2.000000"]
    );
}
