//! Integration tests for selection, clipboard and editing on the model.

use filetree_core::{
    Error, FileOperation, FileUri, MemorySnapshotStorage, NodeId, TreeConfig, ValidationError,
};
use filetree_engine::decoration::{CONTEXT_MENU, CUT, FOCUSED, SELECTED};
use filetree_engine::model::NamePrompt;
use filetree_engine::{ModelService, NodeKind, OperationFailure, PasteType};
use filetree_vfs::{MemoryFileSystem, MemoryFsBuilder};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

async fn workspace() -> (Arc<MemoryFileSystem>, ModelService) {
    let fs = Arc::new(
        MemoryFsBuilder::new()
            .add_file("/w/dir/a.txt", "")
            .add_file("/w/dir/b.txt", "")
            .add_file("/w/dir/c.txt", "")
            .add_file("/w/dir/d.txt", "")
            .add_file("/w/target/keep.txt", "")
            .build()
            .unwrap(),
    );
    let model = ModelService::new(
        fs.clone(),
        Arc::new(MemorySnapshotStorage::new()),
        &TreeConfig::default(),
    );
    model.init(&FileUri::file("/w"), None).await;
    let dir = id(&model, "/w/dir");
    model.service().expand(dir).await;
    (fs, model)
}

fn id(model: &ModelService, path: &str) -> NodeId {
    model
        .service()
        .get_node_by_path(path)
        .unwrap_or_else(|| panic!("no node at {path}"))
}

fn classes(list: &[&str]) -> Vec<String> {
    list.iter().map(|class| (*class).to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_classlists_for_location_activation_and_cut() {
    let (_fs, model) = workspace().await;
    let a = id(&model, "/w/dir/a.txt");
    let b = id(&model, "/w/dir/b.txt");

    let located = model.location(FileUri::file("/w/dir/a.txt")).await;
    assert_eq!(located, Some(a));
    assert_eq!(model.classlist(a), classes(&[SELECTED]));

    model.active_file_decoration(b);
    assert_eq!(model.classlist(a), Vec::<String>::new());
    assert_eq!(model.classlist(b), classes(&[SELECTED, FOCUSED]));

    model.cut_files(&[a]);
    assert_eq!(model.classlist(a), classes(&[CUT]));
}

#[tokio::test(start_paused = true)]
async fn test_toggle_moves_focus_and_removes_selection() {
    let (_fs, model) = workspace().await;
    let a = id(&model, "/w/dir/a.txt");
    let b = id(&model, "/w/dir/b.txt");

    model.active_file_decoration(a);
    model.toggle_file_selected_decoration(b);
    assert_eq!(model.selected_files(), vec![a, b]);
    assert_eq!(model.focused_file(), Some(b));
    assert_eq!(model.classlist(a), classes(&[SELECTED]));

    model.toggle_file_selected_decoration(b);
    assert_eq!(model.selected_files(), vec![a]);
    assert_eq!(model.focused_file(), None);
    assert_eq!(model.classlist(b), Vec::<String>::new());
}

#[tokio::test(start_paused = true)]
async fn test_range_click_selects_by_visible_index() {
    let (_fs, model) = workspace().await;
    let b = id(&model, "/w/dir/b.txt");
    let d = id(&model, "/w/dir/d.txt");
    let c = id(&model, "/w/dir/c.txt");

    model.active_file_decoration(b);
    model.handle_item_range_click(d);

    assert_eq!(model.selected_files(), vec![b, c, d]);
    assert_eq!(model.focused_file(), Some(b));
    assert_eq!(model.classlist(c), classes(&[SELECTED]));
}

#[tokio::test(start_paused = true)]
async fn test_context_menu_suspends_focus_styling() {
    let (_fs, model) = workspace().await;
    let a = id(&model, "/w/dir/a.txt");

    model.active_file_decoration(a);
    model.handle_context_menu(a);
    assert_eq!(model.classlist(a), classes(&[SELECTED, CONTEXT_MENU]));
    assert_eq!(model.context_menu_file(), Some(a));

    model.handle_context_menu_close();
    assert_eq!(model.classlist(a), classes(&[SELECTED, FOCUSED]));
    assert_eq!(model.context_menu_file(), None);
}

#[tokio::test(start_paused = true)]
async fn test_keyboard_navigation_and_collapse_current() {
    let (_fs, model) = workspace().await;
    let dir = id(&model, "/w/dir");
    let a = id(&model, "/w/dir/a.txt");

    model.move_to_next();
    assert_eq!(model.focused_file(), Some(dir));
    model.move_to_next();
    assert_eq!(model.focused_file(), Some(a));
    model.move_to_prev();
    assert_eq!(model.focused_file(), Some(dir));

    model.move_to_next();
    assert!(model.collapse_current());
    assert_eq!(model.focused_file(), Some(dir));
    assert!(!model.tree().is_expanded(dir));
    assert!(model.expand_current().await);
    assert!(model.tree().is_expanded(dir));
}

#[tokio::test(start_paused = true)]
async fn test_cut_paste_moves_and_resets_buffer() {
    let (fs, model) = workspace().await;
    let a = id(&model, "/w/dir/a.txt");
    let target = id(&model, "/w/target");

    model.cut_files(&[a]);
    assert_eq!(model.paste_buffer().paste_type, PasteType::Cut);

    let outcome = model.paste_files(target).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.succeeded, vec![FileUri::file("/w/target/a.txt")]);
    assert!(fs.exists("/w/target/a.txt"));
    assert!(!fs.exists("/w/dir/a.txt"));
    assert_eq!(model.paste_buffer().paste_type, PasteType::None);
    assert_eq!(model.node(a).unwrap().path(), "/w/target/a.txt");
    assert!(!model.classlist(a).contains(&CUT.to_string()));
    assert!(model.tree().is_expanded(target));
}

#[tokio::test(start_paused = true)]
async fn test_copy_paste_picks_unique_names_and_keeps_buffer() {
    let (fs, model) = workspace().await;
    let a = id(&model, "/w/dir/a.txt");
    let dir = id(&model, "/w/dir");

    model.copy_files(&[a]);
    model.paste_files(dir).await.unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(model.service().get_node_by_path("/w/dir/a copy.txt").is_some());

    model.paste_files(a).await.unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;

    assert!(fs.exists("/w/dir/a copy.txt"));
    assert!(fs.exists("/w/dir/a copy 2.txt"));
    assert_eq!(model.paste_buffer().paste_type, PasteType::Copy);
    assert!(model.service().get_node_by_path("/w/dir/a copy 2.txt").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_failed_paste_is_reported_and_others_continue() {
    let (fs, model) = workspace().await;
    let a = id(&model, "/w/dir/a.txt");
    let b = id(&model, "/w/dir/b.txt");
    let target = id(&model, "/w/target");
    fs.inject_failure(FileOperation::Move, "/w/dir/a.txt", "busy")
        .unwrap();

    let reported = Arc::new(Mutex::new(Vec::<OperationFailure>::new()));
    let sink = Arc::clone(&reported);
    let _subscription = model.on_operation_error(move |failure| sink.lock().push(failure.clone()));

    model.cut_files(&[a, b]);
    let outcome = model.paste_files(target).await.unwrap();

    assert_eq!(outcome.succeeded, vec![FileUri::file("/w/target/b.txt")]);
    assert_eq!(outcome.failures.len(), 1);
    let failures = reported.lock().clone();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].operation, FileOperation::Move);
    assert_eq!(failures[0].message, "busy");
    assert!(model.classlist(a).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rename_validation_rejects_bad_names() {
    let (fs, model) = workspace().await;
    let a = id(&model, "/w/dir/a.txt");
    let prompt = NamePrompt::Rename(a);

    assert_eq!(model.validate_file_name(&prompt, "  "), Err(ValidationError::Empty));
    assert_eq!(
        model.validate_file_name(&prompt, "/abs"),
        Err(ValidationError::LeadingSeparator)
    );
    assert!(matches!(
        model.validate_file_name(&prompt, "b.txt"),
        Err(ValidationError::AlreadyExists { .. })
    ));
    assert!(matches!(
        model.validate_file_name(&prompt, "x/../y"),
        Err(ValidationError::InvalidSegment { .. })
    ));
    assert!(model.validate_file_name(&prompt, " spaced ").unwrap().is_some());

    let err = model.rename(a, "b.txt").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(fs.mutation_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_focus_never_styles_the_context_menu_target() {
    let (_fs, model) = workspace().await;
    let a = id(&model, "/w/dir/a.txt");
    let b = id(&model, "/w/dir/b.txt");

    model.active_file_decoration(a);
    model.handle_context_menu(b);
    model.toggle_file_selected_decoration(b);
    assert_eq!(model.focused_file(), Some(b));
    assert_eq!(model.classlist(b), classes(&[SELECTED, CONTEXT_MENU]));

    model.handle_context_menu_close();
    assert_eq!(model.classlist(b), classes(&[SELECTED, FOCUSED]));
    assert_eq!(model.classlist(a), classes(&[SELECTED]));
}

async fn compact_workspace() -> (Arc<MemoryFileSystem>, ModelService, NodeId) {
    let fs = Arc::new(
        MemoryFsBuilder::new()
            .add_file("/w/a/b/x.txt", "")
            .add_file("/w/c/y.txt", "")
            .add_file("/w/c/z.txt", "")
            .build()
            .unwrap(),
    );
    let config = TreeConfig {
        compact_folders: true,
        ..TreeConfig::default()
    };
    let model = ModelService::new(fs.clone(), Arc::new(MemorySnapshotStorage::new()), &config);
    model.init(&FileUri::file("/w"), None).await;
    let folded = model
        .service()
        .get_node_by_uri(&FileUri::file("/w/a"))
        .unwrap();
    model.service().expand(folded).await;
    assert_eq!(model.node(folded).unwrap().name(), "a/b");
    (fs, model, folded)
}

#[tokio::test(start_paused = true)]
async fn test_segment_rename_rejects_existing_sibling() {
    let (fs, model, folded) = compact_workspace().await;
    let head = NamePrompt::RenameSegment {
        id: folded,
        index: 0,
    };

    assert!(matches!(
        model.validate_file_name(&head, "c"),
        Err(ValidationError::AlreadyExists { .. })
    ));
    assert_eq!(model.validate_file_name(&head, "a"), Ok(None));
    assert_eq!(model.validate_file_name(&head, "d"), Ok(None));
    assert_eq!(model.validate_file_name(&NamePrompt::Rename(folded), "b"), Ok(None));

    let err = model.rename_segment(folded, 0, "c").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(fs.mutation_count(), 0);

    model.rename_segment(folded, 0, "d").await.unwrap();
    assert!(fs.exists("/w/d/b/x.txt"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_rename_rolls_back_loading() {
    let (fs, model) = workspace().await;
    let a = id(&model, "/w/dir/a.txt");
    fs.inject_failure(FileOperation::Move, "/w/dir/a.txt", "denied")
        .unwrap();

    let err = model.rename(a, "z.txt").await.unwrap_err();

    assert!(matches!(err, Error::OperationFailed { .. }));
    assert!(model.classlist(a).is_empty());
    assert_eq!(model.node(a).unwrap().path(), "/w/dir/a.txt");
}

#[tokio::test(start_paused = true)]
async fn test_create_file_and_directory() {
    let (fs, model) = workspace().await;
    let dir = id(&model, "/w/dir");
    let a = id(&model, "/w/dir/a.txt");

    let file = model
        .create(a, "new.rs", NodeKind::File)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(model.node(file).unwrap().path(), "/w/dir/new.rs");

    let nested = model
        .create(dir, "sub/inner", NodeKind::Directory)
        .await
        .unwrap()
        .unwrap();
    let nested = model.node(nested).unwrap();
    assert_eq!(nested.path(), "/w/dir/sub");
    assert!(nested.is_directory());
    assert!(fs.exists("/w/dir/sub/inner"));

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(model.service().get_node_by_path("/w/dir/new.rs"), Some(file));
}
