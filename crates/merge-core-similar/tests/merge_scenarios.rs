use merge_core::{
    DiffComputingState, MergeDocuments, MergeEditorModel, MergeEditorOptions,
    MergeRangeAcceptedState, MergeRangeResultState, MergeSide, TextDocument,
};
use merge_core_similar::SimilarDiffComputer;
use pretty_assertions::assert_eq;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

fn documents(base: &str, side1: &str, side2: &str) -> MergeDocuments {
    MergeDocuments {
        base: TextDocument::shared(base),
        side1: TextDocument::shared(side1),
        side2: TextDocument::shared(side2),
        result: TextDocument::shared(""),
    }
}

fn model(docs: &MergeDocuments) -> MergeEditorModel {
    MergeEditorModel::new(
        docs,
        Rc::new(SimilarDiffComputer::new()),
        MergeEditorOptions { reset_result: true },
    )
    .unwrap()
}

#[test]
fn test_one_sided_change_is_auto_merged() {
    let docs = documents("a\nb\nc", "a\nB\nc", "a\nb\nc");
    let model = model(&docs);

    assert_eq!(docs.result.borrow().text(), "a\nB\nc");
    let ranges = model.merge_ranges();
    assert_eq!(ranges.len(), 1);
    assert_eq!(
        model.merge_range_result_state(ranges[0].id()).unwrap(),
        MergeRangeResultState::Accepted(MergeRangeAcceptedState::Side1)
    );
}

#[test]
fn test_column_edits_are_smart_combined() {
    let docs = documents("head\nabc\ntail", "head\nAbc\ntail", "head\nabC\ntail");
    let mut model = model(&docs);

    assert_eq!(docs.result.borrow().text(), "head\nabc\ntail");
    let id = {
        let ranges = model.merge_ranges();
        assert!(ranges[0].is_conflicting());
        assert!(ranges[0].can_be_smart_combined(MergeSide::Side1));
        assert!(!ranges[0].is_smart_combination_order_relevant());
        ranges[0].id()
    };

    model
        .apply_merge_range_accepted_state(id, MergeRangeAcceptedState::Side1Side2Smart)
        .unwrap();
    model.update().unwrap();

    assert_eq!(docs.result.borrow().text(), "head\nAbC\ntail");
    assert_eq!(
        model.merge_range_result_state(id).unwrap(),
        MergeRangeResultState::Accepted(MergeRangeAcceptedState::Side1Side2Smart)
    );
    assert!(model.is_merge_range_handled(id).unwrap());
}

#[test]
fn test_every_applied_state_is_recognized() {
    let docs = documents("head\nabc\ntail", "head\nAbc\ntail", "head\nabC\ntail");
    let mut model = model(&docs);
    let id = model.merge_ranges()[0].id();

    for state in MergeRangeAcceptedState::RECOGNITION_ORDER {
        model.apply_merge_range_accepted_state(id, state).unwrap();
        model.update().unwrap();

        let MergeRangeResultState::Accepted(recognized) =
            model.merge_range_result_state(id).unwrap()
        else {
            panic!("{state} was not recognized");
        };
        let ranges = model.merge_ranges();
        assert_eq!(
            ranges[0].get_base_range_edit(recognized).new_lines,
            ranges[0].get_base_range_edit(state).new_lines,
            "{state} recognized as {recognized}"
        );
    }
}

#[test]
fn test_undo_after_apply_restores_handled_state() {
    let docs = documents("x", "X", "Y");
    let mut model = model(&docs);
    let id = model.merge_ranges()[0].id();
    let before = model.is_merge_range_handled(id).unwrap();

    model
        .apply_merge_range_accepted_state(id, MergeRangeAcceptedState::Side2Side1)
        .unwrap();
    model.update().unwrap();
    assert_eq!(docs.result.borrow().text(), "Y\nX");

    docs.result.borrow_mut().undo().unwrap();
    model.update().unwrap();
    assert_eq!(model.is_merge_range_handled(id).unwrap(), before);
}

#[test]
fn test_threaded_model_becomes_initialized() {
    let docs = documents("a\nb\nc\nd", "a\nB\nc\nd", "a\nb\nc\nD");
    let mut model = MergeEditorModel::new(
        &docs,
        Rc::new(SimilarDiffComputer::new().threaded()),
        MergeEditorOptions { reset_result: true },
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !model.is_initialized() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
        model.update().unwrap();
    }

    assert!(model.is_initialized());
    assert_eq!(model.diff_computing_state(), DiffComputingState::UpToDate);
    assert_eq!(docs.result.borrow().text(), "a\nB\nc\nD");
    assert_eq!(model.unhandled_merge_ranges_count(), 0);
}
