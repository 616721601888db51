use log::Level;
use scene_walker::{ViewerConfig, ViewerEvent, ViewerState, viewer::LoadStatus};

use crate::common::test_utils::capture_logs;

mod common;

#[test]
fn should_log_exactly_one_error_for_a_failed_load() {
    let logs = capture_logs();
    let mut state = ViewerState::new(ViewerConfig {
        model_path: "dispatch/broken-model.glb".to_string(),
        ..Default::default()
    });
    let before = state.scene.children().len();

    state.dispatch(ViewerEvent::LoadError(anyhow::anyhow!("404 Not Found")));

    let errors = logs.matching(Level::Error, "dispatch/broken-model.glb");
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].contains("404"), "{}", errors[0]);
    assert_eq!(state.scene.children().len(), before);
}

#[tokio::test]
async fn should_log_one_error_when_the_model_file_is_missing() {
    let logs = capture_logs();
    let mut state = ViewerState::new(ViewerConfig {
        model_path: "request/absent-model.glb".to_string(),
        ..Default::default()
    });

    let event = state.model_request().await;
    state.dispatch(event);

    assert!(matches!(state.load, LoadStatus::Failed(_)));
    assert_eq!(logs.matching(Level::Error, "request/absent-model.glb").len(), 1);
}
