//! Resolve a small three-way merge from the command line
//!
//! Run with `RUST_LOG=merge_core=debug` to see the model's logging.

use merge_core::{
    MergeDocuments, MergeEditorModel, MergeEditorOptions, MergeRangeAcceptedState,
    MergeRangeResultState, MergeSide, TextDocument,
};
use merge_core_similar::SimilarDiffComputer;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

const BASE: &str = "fn main() {\n    let name = \"world\";\n    println!(\"hello {name}\");\n}";
const SIDE1: &str = "fn main() {\n    let name = \"World\";\n    println!(\"hello {name}\");\n}";
const SIDE2: &str = "fn main() {\n    let name = \"world\";\n    println!(\"Hello, {name}!\");\n}";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let documents = MergeDocuments {
        base: TextDocument::shared(BASE),
        side1: TextDocument::shared(SIDE1),
        side2: TextDocument::shared(SIDE2),
        result: TextDocument::shared(""),
    };
    let mut model = MergeEditorModel::new(
        &documents,
        Rc::new(SimilarDiffComputer::new()),
        MergeEditorOptions { reset_result: true },
    )?;

    println!("=== Auto-merged result ===\n{}\n", documents.result.borrow().text());

    let ranges = model.merge_ranges();
    for range in ranges.iter() {
        let state = model.merge_range_result_state(range.id())?;
        println!(
            "range {} base lines {} conflicting={} state={:?} handled={}",
            range.id(),
            range.base_range(),
            range.is_conflicting(),
            state,
            model.is_merge_range_handled(range.id())?
        );
    }

    for range in ranges.iter() {
        if model.merge_range_result_state(range.id())?
            != MergeRangeResultState::Accepted(MergeRangeAcceptedState::Base)
        {
            continue;
        }
        let state = if range.can_be_smart_combined(MergeSide::Side1) {
            MergeRangeAcceptedState::Side1Side2Smart
        } else {
            MergeRangeAcceptedState::Side1Side2
        };
        model.apply_merge_range_accepted_state(range.id(), state)?;
        model.update()?;
        println!("applied {state} to {}", range.id());
    }

    println!("\n=== Final result ===\n{}", documents.result.borrow().text());
    println!("unhandled ranges: {}", model.unhandled_merge_ranges_count());
    Ok(())
}
