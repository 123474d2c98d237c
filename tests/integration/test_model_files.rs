use dvg::vector::DocVector;
use dvg::{DvgError, find_model_spec, load_model, tokenizer_for};

use crate::common::{MODEL_NAME, Workspace, install_model};

#[test]
fn installed_model_is_found_by_name_and_by_file() {
    let ws = Workspace::new();
    let (spec, model, tokenizer) = ws.open_model();
    assert_eq!(spec.name, MODEL_NAME);
    assert_eq!(spec.tokenizer, "ws");
    assert_eq!(spec.version.as_deref(), Some("1"));
    assert_eq!(spec.file_name(), "topics.dvgm");
    assert_eq!(tokenizer.name(), "ws");
    assert_eq!(model.vocabulary_size(), 5);

    let by_file = find_model_spec(
        &ws.settings.model.dir,
        spec.file.to_str().unwrap(),
    )
    .unwrap();
    assert_eq!(by_file.tokenizer, "en");
    assert_eq!(load_model(&by_file.file).unwrap().vocabulary_size(), 5);
}

#[test]
fn unknown_model_is_not_found() {
    let ws = Workspace::new();
    let err = find_model_spec(&ws.settings.model.dir, "nope").unwrap_err();
    assert!(matches!(err, DvgError::ModelNotFound { .. }));
    assert_eq!(err.status_code(), "MODEL_NOT_FOUND");
}

#[test]
fn duplicate_specs_are_rejected() {
    let ws = Workspace::new();
    let nested = ws.settings.model.dir.join("copy");
    std::fs::create_dir_all(&nested).unwrap();
    install_model(&nested);
    let err = find_model_spec(&ws.settings.model.dir, MODEL_NAME).unwrap_err();
    assert!(matches!(err, DvgError::ModelSpec { .. }));
}

#[test]
fn loaded_model_embeds_single_words_exactly() {
    let ws = Workspace::new();
    let (_, model, _) = ws.open_model();

    // alpha: cluster row [1, 0, 0] times idf row [1, 0]
    let alpha = model.embed(&["alpha"]);
    assert_eq!(alpha.as_slice(), &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

    // stone: [0, .5, .5] x [.9, .1], normalized
    let stone = model.embed(&["stone"]);
    let expected = DocVector::normalized(vec![0.0, 0.0, 0.45, 0.05, 0.45, 0.05]);
    for (a, e) in stone.as_slice().iter().zip(expected.as_slice()) {
        assert!((a - e).abs() < 1e-6);
    }

    assert_eq!(model.find_oov_tokens(&["alpha", "omega"]), vec!["omega"]);
}

#[test]
fn zero_query_cannot_be_specialized() {
    let ws = Workspace::new();
    let (_, model, _) = ws.open_model();
    let zero = model.embed(&["omega"]);
    let err = model.specialize_for_query(&zero).unwrap_err();
    assert_eq!(err.to_string(), "query vector does not contain any topics in the model");
}

#[test]
fn english_tokenizer_lowercases_and_splits_punctuation() {
    let en = tokenizer_for("en").unwrap();
    assert_eq!(
        en.tokenize("Rivers, stones-and ALPHA!"),
        vec!["rivers", ",", "stones-and", "alpha", "!"]
    );
    assert!(matches!(
        tokenizer_for("xx"),
        Err(DvgError::UnknownTokenizer { .. })
    ));
}
