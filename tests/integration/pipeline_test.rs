//! End-to-end tests of the library pipeline: export rows to stored records.

use tempfile::TempDir;

use msgsift::archive::typedstream;
use msgsift::assemble::{session_records, SessionRecord};
use msgsift::events::load_events;
use msgsift::extract::payload_tokens;
use msgsift::session::{ReconstructOptions, SessionError};
use msgsift::store::RecordStore;
use msgsift::{FailurePolicy, GameSession, Reconstructor, TerminationOutcome};

use crate::helpers::{checkers_game, keyed_archive, typed_stream, write_export, Row};

fn reconstructor(policy: FailurePolicy) -> Reconstructor {
    Reconstructor::with_known_ids(
        ["Checkers".to_string(), "8 Ball".to_string()],
        ReconstructOptions {
            policy,
            ..Default::default()
        },
    )
}

fn resolve(rows: &[Row]) -> Result<GameSession, SessionError> {
    let events: Vec<_> = rows.iter().map(Row::to_event).collect();
    let mut report = reconstructor(FailurePolicy::Abort).run(&events)?;
    assert_eq!(report.sessions.len(), 1);
    Ok(report.sessions.remove(0))
}

fn mine(id: i64, timestamp: i64) -> Row {
    Row::new(id, timestamp).group("g").from_me()
}

fn theirs(id: i64, timestamp: i64) -> Row {
    Row::new(id, timestamp).group("g")
}

fn invite() -> Row {
    mine(1, 100).text("Let's play Checkers")
}

fn outcome(rows: &[Row]) -> TerminationOutcome {
    resolve(rows).unwrap().outcome
}

// ============================================================================
// Outcome resolution
// ============================================================================

#[test]
fn draw_phrase_is_draw_regardless_of_sender() {
    let from_them = theirs(2, 200).text("Draw!");
    let from_me = mine(2, 200).text("Draw!");

    assert_eq!(outcome(&[invite(), from_them]), TerminationOutcome::Draw);
    assert_eq!(outcome(&[invite(), from_me]), TerminationOutcome::Draw);
}

#[test]
fn i_won_depends_on_sender() {
    let by_me = mine(2, 200).payload(&["I won!"]);
    let by_them = theirs(2, 200).payload(&["I won!"]);

    assert_eq!(outcome(&[invite(), by_me]), TerminationOutcome::Won);
    assert_eq!(outcome(&[invite(), by_them]), TerminationOutcome::Lost);
}

#[test]
fn both_phrases_follow_the_i_won_sender() {
    let they_won = vec![
        invite(),
        theirs(2, 200).payload(&["I won!"]),
        mine(3, 300).payload(&["You won!"]),
    ];
    assert_eq!(outcome(&they_won), TerminationOutcome::Lost);

    let i_won = vec![
        invite(),
        theirs(2, 200).payload(&["You won!"]),
        mine(3, 300).payload(&["I won!"]),
    ];
    assert_eq!(outcome(&i_won), TerminationOutcome::Won);
}

#[test]
fn scores_decide_without_text() {
    let rows = vec![
        invite(),
        mine(2, 200).payload(&["10 points"]),
        theirs(3, 300).payload(&["7 points"]),
    ];
    let session = resolve(&rows).unwrap();

    assert_eq!(session.outcome, TerminationOutcome::Won);
    assert_eq!(session.own_score, Some(10));
    assert_eq!(session.opponent_score, Some(7));
}

#[test]
fn scores_override_two_phrase_evidence() {
    let rows = vec![
        invite(),
        theirs(2, 200).payload(&["I won!", "3 points"]),
        mine(3, 300).payload(&["You won!", "9 points"]),
    ];
    assert_eq!(outcome(&rows), TerminationOutcome::Won);
}

#[test]
fn equal_scores_are_a_draw() {
    let rows = vec![
        invite(),
        mine(2, 200).payload(&["5 points"]),
        theirs(3, 300).payload(&["5 points"]),
    ];
    assert_eq!(outcome(&rows), TerminationOutcome::Draw);
}

#[test]
fn contradicting_text_and_scores_fail() {
    let rows = vec![
        invite(),
        mine(2, 200).payload(&["You won!", "10 points"]),
        theirs(3, 300).payload(&["7 points"]),
    ];

    match resolve(&rows).unwrap_err() {
        SessionError::InconsistentOutcome {
            correlation_id,
            textual,
            numeric,
            own_score,
            opponent_score,
        } => {
            assert_eq!(correlation_id, "g");
            assert_eq!(textual, TerminationOutcome::Lost);
            assert_eq!(numeric, TerminationOutcome::Won);
            assert_eq!((own_score, opponent_score), (10, 7));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn no_evidence_is_unknown() {
    let rows = vec![invite(), theirs(2, 200).text("Your move")];
    let session = resolve(&rows).unwrap();

    assert_eq!(session.outcome, TerminationOutcome::Unknown);
    assert_eq!(session.own_score, None);
    assert_eq!(session.opponent_score, None);
}

// ============================================================================
// Session fields
// ============================================================================

#[test]
fn session_spans_group_and_takes_first_sender() {
    let rows = vec![
        Row::new(3, 900).group("g").handle(2).text("I won!"),
        mine(1, 100).handle(5).text("Let's play 8 Ball"),
        Row::new(2, 500).group("g").handle(2),
    ];
    let session = resolve(&rows).unwrap();

    assert_eq!(session.application_id, "8 Ball");
    assert_eq!(session.start_timestamp, 100);
    assert_eq!(session.end_timestamp, 900);
    assert_eq!(session.opponent_handle_id, 5);
    assert_eq!(session.outcome, TerminationOutcome::Lost);
}

#[test]
fn rich_body_stands_in_for_missing_text() {
    let rows = vec![
        mine(1, 100).body(typed_stream("Let's play Checkers")),
        mine(2, 200).body(typed_stream("Draw!")),
    ];
    let session = resolve(&rows).unwrap();

    assert_eq!(session.application_id, "Checkers");
    assert_eq!(session.outcome, TerminationOutcome::Draw);
}

#[test]
fn unknown_application_is_ambiguous() {
    let rows = vec![Row::new(1, 100).group("g").text("Let's play Chess")];
    assert!(matches!(
        resolve(&rows),
        Err(SessionError::AmbiguousApplicationId { .. })
    ));
}

// ============================================================================
// Decoders
// ============================================================================

#[test]
fn payload_tokens_drop_structural_entries() {
    let bytes = keyed_archive(&["GamePigeon", "appid", "com.example.go", "You won!"]);
    let tokens = payload_tokens(&bytes).unwrap();
    assert_eq!(tokens, vec!["com.example.go", "You won!"]);
}

#[test]
fn typed_stream_yields_its_byte_string() {
    let text = typedstream::decode_text(&typed_stream("hello")).unwrap();
    assert_eq!(text, "hello");
}

// ============================================================================
// Batches and persistence
// ============================================================================

#[test]
fn parallel_and_sequential_runs_agree() {
    let mut rows = checkers_game("a", 1000);
    rows.extend(checkers_game("b", 2000));
    rows.extend(checkers_game("c", 3000));
    let events: Vec<_> = rows.iter().map(Row::to_event).collect();

    let run = |parallel| {
        Reconstructor::with_known_ids(
            ["Checkers".to_string()],
            ReconstructOptions {
                parallel,
                ..Default::default()
            },
        )
        .run(&events)
        .unwrap()
        .sessions
    };

    let parallel = run(true);
    assert_eq!(parallel, run(false));
    let ids: Vec<String> = parallel.into_iter().map(|s| s.correlation_id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn abort_and_skip_policies_on_a_malformed_payload() {
    let mut rows = checkers_game("good", 1000);
    rows.push(
        Row::new(50, 50)
            .group("bad")
            .text("Let's play Checkers")
            .raw_payload(b"bplist00garbage".to_vec()),
    );
    let events: Vec<_> = rows.iter().map(Row::to_event).collect();

    let err = reconstructor(FailurePolicy::Abort)
        .run(&events)
        .unwrap_err();
    assert_eq!(err.correlation_id(), "bad");

    let report = reconstructor(FailurePolicy::Skip).run(&events).unwrap();
    assert_eq!(report.sessions.len(), 1);
    assert_eq!(report.sessions[0].correlation_id, "good");
    assert_eq!(report.failures.len(), 1);
}

#[test]
fn rerunning_a_batch_into_the_store_adds_nothing() {
    let dir = TempDir::new().unwrap();
    let mut rows = checkers_game("a", 1000);
    rows.extend(checkers_game("b", 2000));
    rows.push(Row::new(99, 99).text("no correlation id"));
    let export = write_export(dir.path(), &rows);
    let store_path = dir.path().join("out/sessions.jsonl");

    for expected_inserted in [2, 0] {
        let events = load_events(&export).unwrap();
        let report = reconstructor(FailurePolicy::Abort).run(&events).unwrap();
        assert_eq!(report.excluded, 1);

        let records = session_records(report.sessions);
        let mut store = RecordStore::<SessionRecord>::open(&store_path).unwrap();
        let summary = store.insert_or_ignore(&records).unwrap();
        assert_eq!(summary.inserted, expected_inserted);
    }

    let stored = RecordStore::<SessionRecord>::open(&store_path)
        .unwrap()
        .read_all()
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].outcome, 1);
    assert_eq!(stored[0].own_score, Some(10));
    assert_eq!(stored[0].opponent_score, Some(7));
}
